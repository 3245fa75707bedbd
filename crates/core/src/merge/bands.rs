//! Mosaic band schema
//!
//! The ten int8 bands of the statewide mosaic, in storage order. Names,
//! descriptions and units are the stable contract with downstream
//! predictive modeling; nodata is globally −128 with 127 reserved for
//! "observed, never recovered" in the time bands.

/// One band of the statewide mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicBand {
    pub name: &'static str,
    pub description: &'static str,
    pub units: &'static str,
}

/// Number of bands in the mosaic.
pub const NUM_BANDS: usize = 10;

/// The mosaic schema, in band order.
pub const MOSAIC_BANDS: [MosaicBand; NUM_BANDS] = [
    MosaicBand {
        name: "matched_recovery_time",
        description: "Seasons to recovery vs. the matched-group baseline; \
                      127 = never recovered, -128 = no data",
        units: "seasons",
    },
    MosaicBand {
        name: "matched_recovery_status",
        description: "1 = recovered, 0 = never recovered, -128 = no data",
        units: "dimensionless",
    },
    MosaicBand {
        name: "prefire_baseline_recovery_time",
        description: "Seasons to recovery vs. the pixel's own pre-fire \
                      baseline; 127 = never recovered, -128 = no data",
        units: "seasons",
    },
    MosaicBand {
        name: "prefire_baseline_recovery_status",
        description: "1 = recovered, 0 = never recovered, -128 = no data",
        units: "dimensionless",
    },
    MosaicBand {
        name: "vegetation_type",
        description: "Vegetation type code of the pixel's matched group; \
                      assumes base group ids encode veg_code * 10 + \
                      elevation band, so the code is refined_id / 10000",
        units: "dimensionless",
    },
    MosaicBand {
        name: "UID_h",
        description: "Fire UID thousands/hundreds digits (uid / 100)",
        units: "dimensionless",
    },
    MosaicBand {
        name: "UID_to",
        description: "Fire UID tens/ones digits (uid % 100)",
        units: "dimensionless",
    },
    MosaicBand {
        name: "severity",
        description: "Burn severity class (2 low, 3 medium, 4 high)",
        units: "dimensionless",
    },
    MosaicBand {
        name: "fire_yr",
        description: "Fire year counted from the base year (0 = 1982)",
        units: "years",
    },
    MosaicBand {
        name: "burn_bndy_dist",
        description: "Distance from the burn boundary, in hundreds of \
                      meters (ceiling); distances beyond 12.7 km stored as 127",
        units: "hundreds of meters",
    },
];

/// Storage index of a band name.
#[must_use]
pub fn band_index(name: &str) -> Option<usize> {
    MOSAIC_BANDS.iter().position(|b| b.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_order_and_lookup() {
        assert_eq!(MOSAIC_BANDS.len(), NUM_BANDS);
        assert_eq!(band_index("matched_recovery_time"), Some(0));
        assert_eq!(band_index("burn_bndy_dist"), Some(NUM_BANDS - 1));
        assert_eq!(band_index("not_a_band"), None);

        // names are unique
        for (i, b) in MOSAIC_BANDS.iter().enumerate() {
            assert_eq!(band_index(b.name), Some(i));
        }
    }
}
