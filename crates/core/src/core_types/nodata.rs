//! Centralized nodata sentinel policy
//!
//! Every band written by the assembler, classifier, exporter, or merge
//! engine takes its sentinel from this table instead of re-deriving it at
//! the write site. Downstream consumers rely on the exact values:
//!
//! | band family                       | dtype | nodata |
//! |-----------------------------------|-------|--------|
//! | int8 masks / QA / status          | i8    | −1     |
//! | int32 counts / recovery times     | i32   | −9999  |
//! | float32 index / baselines         | f32   | NaN, written as −9999 |
//! | statewide mosaic bands            | i8    | −128 (plus 127 "never recovered") |

/// Ternary-with-sentinels states of the per-date threshold layer.
///
/// Non-negative values are real classifications; negative values are the
/// three distinct "no evidence" states. The detector treats anything
/// negative as a gap, while the QA pass counts only non-negative cells as
/// covered.
pub mod threshold_state {
    /// Vegetation index at or above the matched-group baseline
    pub const ABOVE: i8 = 1;
    /// Vegetation index below the baseline
    pub const BELOW: i8 = 0;
    /// The index value itself is missing at this date
    pub const MISSING_INDEX: i8 = -1;
    /// The matched group had too few undisturbed pixels at this date
    pub const GROUP_INVALID: i8 = -2;
    /// Never classified: no matched group, no undisturbed reference this
    /// date, or a non-positive threshold
    pub const UNCLASSIFIED: i8 = -3;
}

/// Nodata sentinels per band name and width.
#[derive(Debug, Clone, Copy)]
pub struct NodataPolicy;

impl NodataPolicy {
    /// Sentinel for int8 mask/status/QA bands.
    pub const INT8_MASK: i8 = -1;
    /// Sentinel for int32 count/time/group bands.
    pub const INT32: i32 = -9999;
    /// Sentinel written for float32 bands on disk.
    pub const FLOAT32: f32 = -9999.0;
    /// Global nodata of the statewide int8 mosaic.
    pub const MOSAIC: i8 = -128;
    /// "Never recovered" in the mosaic: distinct from nodata so downstream
    /// models can separate "no evidence" from "observed, never recovered".
    pub const NEVER_RECOVERED: i8 = 127;

    /// Sentinel for a named per-fire export band, as (dtype name, value).
    /// Unknown bands default to the int32 sentinel.
    #[must_use]
    pub fn for_band(band: &str) -> BandNodata {
        match band {
            "severity"
            | "dist_mask"
            | "future_dist_agdev_mask"
            | "past_dist_agdev_mask"
            | "temporal_coverage_qa"
            | "matched_group_temporal_coverage_qa" => BandNodata::I8(Self::INT8_MASK),
            "prefire_ndvi_baseline" => BandNodata::F32(Self::FLOAT32),
            _ => BandNodata::I32(Self::INT32),
        }
    }
}

/// A typed nodata sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandNodata {
    I8(i8),
    I32(i32),
    F32(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_sentinels() {
        assert_eq!(
            NodataPolicy::for_band("temporal_coverage_qa"),
            BandNodata::I8(-1)
        );
        assert_eq!(
            NodataPolicy::for_band("fire_recovery_time"),
            BandNodata::I32(-9999)
        );
        assert_eq!(
            NodataPolicy::for_band("prefire_ndvi_baseline"),
            BandNodata::F32(-9999.0)
        );
    }

    #[test]
    fn test_mosaic_sentinels_are_distinct() {
        assert_ne!(NodataPolicy::MOSAIC, NodataPolicy::NEVER_RECOVERED);
        assert_eq!(NodataPolicy::MOSAIC, i8::MIN);
        assert_eq!(NodataPolicy::NEVER_RECOVERED, i8::MAX);
    }
}
