//! Recovery threshold classification
//!
//! Each burned pixel's NDVI is compared, season by season, against the
//! `lower` threshold of its matched group's undisturbed reference
//! population. The result is a ternary series per pixel (see
//! [`threshold_state`]): above, below, or one of the negative sentinels
//! for missing data and untrustworthy groups.

use ndarray::Array3;
use tracing::debug;

use crate::core_types::config::RecoveryParams;
use crate::core_types::nodata::threshold_state;
use crate::cube::FireDataCube;
use crate::stats::SummaryTable;

/// Attach the ternary threshold series to the cube.
///
/// A group/season whose undisturbed reference has fewer than
/// `min_num_matched_pixels` observations is untrustworthy: every pixel of
/// that group that season becomes [`threshold_state::GROUP_INVALID`]. A
/// reference that is absent or yields a non-positive threshold is skipped,
/// leaving those pixels at [`threshold_state::UNCLASSIFIED`] like pixels
/// with no matched group at all.
#[must_use]
pub fn classify(mut cube: FireDataCube, summary: &SummaryTable, params: &RecoveryParams) -> FireDataCube {
    let (t, rows, cols) = cube.shape();
    let mut threshold = Array3::from_elem((t, rows, cols), threshold_state::UNCLASSIFIED);

    for time in 0..t {
        for row in 0..rows {
            for col in 0..cols {
                let group = cube.groups[[row, col]];
                if group <= 0 {
                    continue;
                }
                match summary.undisturbed_row(time, group) {
                    Some(r) if r.count < params.min_num_matched_pixels => {
                        threshold[[time, row, col]] = threshold_state::GROUP_INVALID;
                    }
                    Some(r) if r.lower > 0.0 => {
                        let v = cube.ndvi[[time, row, col]];
                        threshold[[time, row, col]] = if v.is_nan() {
                            threshold_state::MISSING_INDEX
                        } else if v >= r.lower {
                            threshold_state::ABOVE
                        } else {
                            threshold_state::BELOW
                        };
                    }
                    // absent reference or non-positive threshold
                    _ => {}
                }
            }
        }
    }

    debug!(fire = %cube.fire.prefix(), "threshold series classified");
    cube.threshold = Some(threshold);
    cube
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::nodata::NodataPolicy;
    use crate::cube::testutil::synthetic_cube;
    use crate::stats;
    use chrono::NaiveDate;

    /// Cube whose right columns form a large undisturbed reference so the
    /// matched-pixel minimum is satisfied.
    fn classified_cube(reference_ndvi: f32, burned_ndvi: f32) -> FireDataCube {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(2, 8, 8, start);
        let params = RecoveryParams {
            min_num_matched_pixels: 30,
            ..RecoveryParams::default()
        };
        for row in 0..8 {
            for col in 0..8 {
                let burned = col < 2;
                cube.severity[[row, col]] = if burned { 3 } else { 0 };
                for t in 0..2 {
                    cube.ndvi[[t, row, col]] = if burned { burned_ndvi } else { reference_ndvi };
                }
            }
        }
        let table = stats::compute(&cube);
        classify(cube, &table, &params)
    }

    #[test]
    fn test_above_and_below_threshold() {
        // reference constant 0.6 → lower = 0.6
        let cube = classified_cube(0.6, 0.7);
        let th = cube.threshold.as_ref().unwrap();
        assert_eq!(th[[0, 0, 0]], threshold_state::ABOVE);
        assert_eq!(th[[0, 0, 7]], threshold_state::ABOVE);

        let cube = classified_cube(0.6, 0.3);
        let th = cube.threshold.as_ref().unwrap();
        assert_eq!(th[[0, 0, 0]], threshold_state::BELOW);
    }

    #[test]
    fn test_missing_index_sentinel() {
        let mut cube = classified_cube(0.6, 0.7);
        cube.threshold = None;
        cube.ndvi[[1, 0, 0]] = f32::NAN;
        let table = stats::compute(&cube);
        let params = RecoveryParams::default();
        let cube = classify(cube, &table, &params);
        let th = cube.threshold.as_ref().unwrap();
        assert_eq!(th[[0, 0, 0]], threshold_state::ABOVE);
        assert_eq!(th[[1, 0, 0]], threshold_state::MISSING_INDEX);
    }

    #[test]
    fn test_sparse_group_is_invalid() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        // far fewer undisturbed pixels than the minimum
        let mut cube = synthetic_cube(1, 2, 2, start);
        cube.severity[[0, 0]] = 3;
        cube.severity[[0, 1]] = 0;
        cube.severity[[1, 0]] = 0;
        cube.severity[[1, 1]] = 0;

        let table = stats::compute(&cube);
        let cube = classify(cube, &table, &RecoveryParams::default());
        let th = cube.threshold.as_ref().unwrap();
        assert_eq!(th[[0, 0, 0]], threshold_state::GROUP_INVALID);
    }

    #[test]
    fn test_nonpositive_threshold_leaves_pixels_unclassified() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(1, 8, 8, start);
        // 16 burned pixels; 48 undisturbed with a skewed distribution whose
        // median sits below one standard deviation (lower < 0)
        for row in 0..8 {
            for col in 0..8 {
                let burned = col < 2;
                cube.severity[[row, col]] = if burned { 3 } else { 0 };
                if burned {
                    cube.ndvi[[0, row, col]] = 0.5;
                } else {
                    // 10 outliers at 2.0, the rest at 0.1
                    cube.ndvi[[0, row, col]] = if row == 0 && col >= 6 || row == 1 { 2.0 } else { 0.1 };
                }
            }
        }
        let table = stats::compute(&cube);
        let row = table.undisturbed_row(0, 11_050).unwrap();
        assert!(row.count >= 30);
        assert!(row.lower <= 0.0);

        let cube = classify(cube, &table, &RecoveryParams::default());
        let th = cube.threshold.as_ref().unwrap();
        assert_eq!(th[[0, 0, 0]], threshold_state::UNCLASSIFIED);
    }

    #[test]
    fn test_ungrouped_pixels_stay_unclassified() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(1, 8, 8, start);
        cube.groups[[0, 0]] = NodataPolicy::INT32;
        for row in 0..8 {
            for col in 2..8 {
                cube.severity[[row, col]] = 0;
            }
        }
        let table = stats::compute(&cube);
        let cube = classify(cube, &table, &RecoveryParams::default());
        let th = cube.threshold.as_ref().unwrap();
        assert_eq!(th[[0, 0, 0]], threshold_state::UNCLASSIFIED);
    }
}
