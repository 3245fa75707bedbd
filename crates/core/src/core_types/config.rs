//! Recovery pipeline parameters
//!
//! One `RecoveryParams` is shared by every fire in a run. It is loaded from
//! a JSON file produced by the (external) configuration-generation step;
//! defaults match the production configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::RecoveryError;

/// Tunable parameters of the recovery detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryParams {
    /// Smallest vegetation-index value considered real data
    pub ndvi_lower_bound: f32,
    /// Largest vegetation-index value considered real data
    pub ndvi_upper_bound: f32,
    /// Minimum undisturbed pixels in a matched group for its statistics to
    /// be trusted at a given date
    pub min_num_matched_pixels: usize,
    /// Rolling-window length of the recovery detector, in seasons
    pub min_seasons: usize,
    /// Years of pre-fire data used for matching and QA windows
    pub yrs_prefire_matched: i64,
    /// Number of NDVI quantile bins appended to each base group
    pub num_ndvi_groups: usize,
    /// Fraction of window dates that must carry data to pass coverage QA
    pub min_temporal_coverage_ratio: f64,
    /// Nominal month of each season (season 1-4 → month)
    pub season_months: [u32; 4],
    /// Base year of the mosaic `fire_yr` band
    pub mosaic_base_year: i32,
    /// Also write the classified threshold series as a per-fire
    /// intermediate GeoTIFF next to the other outputs
    pub create_intermediate_outputs: bool,
}

impl Default for RecoveryParams {
    fn default() -> Self {
        Self {
            ndvi_lower_bound: 0.0,
            ndvi_upper_bound: 1.0,
            min_num_matched_pixels: 30,
            min_seasons: 4,
            yrs_prefire_matched: 5,
            num_ndvi_groups: 3,
            min_temporal_coverage_ratio: 0.5,
            season_months: [1, 4, 7, 10],
            mosaic_base_year: 1982,
            create_intermediate_outputs: false,
        }
    }
}

impl RecoveryParams {
    /// Load parameters from a JSON file.
    ///
    /// # Errors
    /// Returns [`RecoveryError::Config`] when the file cannot be read or
    /// parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RecoveryError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| RecoveryError::Config(format!("cannot read params: {e}")))?;
        serde_json::from_str(&contents)
            .map_err(|e| RecoveryError::Config(format!("cannot parse params: {e}")))
    }

    /// Nominal month of a 1-based season number.
    #[must_use]
    pub fn month_for_season(&self, season: u32) -> Option<u32> {
        if (1..=4).contains(&season) {
            Some(self.season_months[(season - 1) as usize])
        } else {
            None
        }
    }

    /// True when an index value lies inside the configured valid range.
    #[must_use]
    pub fn ndvi_in_range(&self, value: f32) -> bool {
        !value.is_nan() && value > self.ndvi_lower_bound && value <= self.ndvi_upper_bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let p = RecoveryParams::default();
        assert!(p.min_seasons >= 2);
        assert_eq!(p.month_for_season(1), Some(1));
        assert_eq!(p.month_for_season(4), Some(10));
        assert_eq!(p.month_for_season(5), None);
    }

    #[test]
    fn test_ndvi_range_excludes_bounds_like_source() {
        let p = RecoveryParams::default();
        // values <= lower bound are masked, values > upper bound are masked
        assert!(!p.ndvi_in_range(0.0));
        assert!(p.ndvi_in_range(1.0));
        assert!(!p.ndvi_in_range(1.01));
        assert!(!p.ndvi_in_range(f32::NAN));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let p: RecoveryParams = serde_json::from_str(r#"{"min_seasons": 3}"#).unwrap();
        assert_eq!(p.min_seasons, 3);
        assert_eq!(p.min_num_matched_pixels, 30);
    }
}
