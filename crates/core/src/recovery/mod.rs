//! Rolling-window recovery detection
//!
//! A pixel counts as recovered at the first post-fire season that closes a
//! full trailing window of `min_seasons` seasons in which every classified
//! season was above threshold and at most one season is missing. Requiring
//! the full window means the earliest possible recovery time is
//! `min_seasons - 1` seasons after the fire, so a sensor gap right at
//! ignition can never produce a zero-time recovery.
//!
//! Detection runs twice: against the matched-group threshold series, and
//! against the pixel's own pre-fire baseline (median minus one standard
//! deviation of its pre-fire NDVI).

use chrono::Duration;
use ndarray::Array2;
use tracing::debug;

use crate::core_types::config::RecoveryParams;
use crate::core_types::nodata::{threshold_state, NodataPolicy};
use crate::cube::FireDataCube;
use crate::error::RecoveryError;

/// Index of the first window-closing season in a post-fire state series,
/// or `None` when no window ever qualifies. `None` entries are seasons
/// with no usable observation; `Some(true)` is an above-threshold season.
fn first_sustained(states: &[Option<bool>], min_seasons: usize) -> Option<usize> {
    if states.len() < min_seasons || min_seasons == 0 {
        return None;
    }
    // at most one missing season per window, and never a fully empty one
    let min_present = (min_seasons - 1).max(1);
    for i in (min_seasons - 1)..states.len() {
        let window = &states[i + 1 - min_seasons..=i];
        let present = window.iter().filter(|s| s.is_some()).count();
        if present >= min_present && window.iter().flatten().all(|&above| above) {
            return Some(i);
        }
    }
    None
}

/// Detect recovery against the matched-group threshold series and attach
/// `fire_recovery_time` (post-fire season index; nodata = never).
///
/// # Errors
/// Fails when the threshold series has not been classified yet.
pub fn detect_matched(
    mut cube: FireDataCube,
    params: &RecoveryParams,
) -> Result<FireDataCube, RecoveryError> {
    let threshold = cube
        .threshold
        .as_ref()
        .ok_or_else(|| RecoveryError::Config("recovery detection requires the threshold series".into()))?;

    let postfire = cube.postfire_range();
    let (_, rows, cols) = cube.shape();
    let mut out = Array2::from_elem((rows, cols), NodataPolicy::INT32);
    let mut states = Vec::with_capacity(postfire.len());
    for row in 0..rows {
        for col in 0..cols {
            states.clear();
            for t in postfire.clone() {
                states.push(match threshold[[t, row, col]] {
                    threshold_state::ABOVE => Some(true),
                    threshold_state::BELOW => Some(false),
                    _ => None,
                });
            }
            if let Some(i) = first_sustained(&states, params.min_seasons) {
                out[[row, col]] = i as i32;
            }
        }
    }

    debug!(fire = %cube.fire.prefix(), "matched recovery detected");
    cube.fire_recovery_time = Some(out);
    Ok(cube)
}

/// Attach each pixel's own pre-fire baseline: median minus one population
/// standard deviation of its valid NDVI over `yrs_prefire_matched` years
/// before ignition. Pixels with no valid pre-fire observation get NaN.
#[must_use]
pub fn compute_baseline(mut cube: FireDataCube, params: &RecoveryParams) -> FireDataCube {
    let end = cube.ignition();
    let start = end - Duration::weeks(52 * params.yrs_prefire_matched);
    let window = cube.axis.window(start, end);
    let (_, rows, cols) = cube.shape();

    let mut baseline = Array2::from_elem((rows, cols), f32::NAN);
    let mut values: Vec<f32> = Vec::with_capacity(window.len());
    for row in 0..rows {
        for col in 0..cols {
            values.clear();
            for t in window.clone() {
                let v = cube.ndvi[[t, row, col]];
                if params.ndvi_in_range(v) {
                    values.push(v);
                }
            }
            if values.is_empty() {
                continue;
            }
            values.sort_unstable_by(f32::total_cmp);
            let n = values.len();
            let median = if n % 2 == 1 {
                values[n / 2]
            } else {
                (values[n / 2 - 1] + values[n / 2]) / 2.0
            };
            let mean = values.iter().sum::<f32>() / n as f32;
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n as f32;
            baseline[[row, col]] = median - var.sqrt();
        }
    }

    cube.prefire_ndvi_baseline = Some(baseline);
    cube
}

/// Detect recovery against the pixel's own pre-fire baseline and attach
/// `prefire_baseline_recovery_time`. Pixels without a baseline never
/// recover.
///
/// # Errors
/// Fails when the baseline layer has not been computed yet.
pub fn detect_baseline(
    mut cube: FireDataCube,
    params: &RecoveryParams,
) -> Result<FireDataCube, RecoveryError> {
    let baseline = cube
        .prefire_ndvi_baseline
        .as_ref()
        .ok_or_else(|| RecoveryError::Config("baseline detection requires the pre-fire baseline".into()))?;

    let postfire = cube.postfire_range();
    let (_, rows, cols) = cube.shape();
    let mut out = Array2::from_elem((rows, cols), NodataPolicy::INT32);
    let mut states = Vec::with_capacity(postfire.len());
    for row in 0..rows {
        for col in 0..cols {
            let b = baseline[[row, col]];
            if b.is_nan() {
                continue;
            }
            states.clear();
            for t in postfire.clone() {
                let v = cube.ndvi[[t, row, col]];
                states.push(if v.is_nan() { None } else { Some(v >= b) });
            }
            if let Some(i) = first_sustained(&states, params.min_seasons) {
                out[[row, col]] = i as i32;
            }
        }
    }

    debug!(fire = %cube.fire.prefix(), "baseline recovery detected");
    cube.prefire_baseline_recovery_time = Some(out);
    Ok(cube)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::testutil::{synthetic_cube, NEVER};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::Array3;

    fn detect_series(series: &[i8]) -> i32 {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(series.len(), 1, 1, start);
        cube.fire.ignition = start;
        let mut th = Array3::from_elem((series.len(), 1, 1), 0_i8);
        for (t, v) in series.iter().enumerate() {
            th[[t, 0, 0]] = *v;
        }
        cube.threshold = Some(th);
        let cube = detect_matched(cube, &RecoveryParams::default()).unwrap();
        cube.fire_recovery_time.as_ref().unwrap()[[0, 0]]
    }

    #[test]
    fn test_recovery_at_first_full_window() {
        // four consecutive above seasons close at index 3
        assert_eq!(detect_series(&[1, 1, 1, 1, 1, 1]), 3);
        // a below season pushes the window out
        assert_eq!(detect_series(&[1, 0, 1, 1, 1, 1]), 5);
    }

    #[test]
    fn test_one_missing_season_is_tolerated_two_are_not() {
        let m = threshold_state::MISSING_INDEX;
        assert_eq!(detect_series(&[1, m, 1, 1, 1, 1]), 3);
        assert_eq!(detect_series(&[1, m, m, 1, 1, 1, 1]), 6);
    }

    #[test]
    fn test_never_recovered_and_short_series() {
        assert_eq!(detect_series(&[1, 0, 1, 0, 1, 0]), NEVER);
        assert_eq!(detect_series(&[1, 1, 1]), NEVER);
        let g = threshold_state::GROUP_INVALID;
        assert_eq!(detect_series(&[g, g, g, g, g, g]), NEVER);
    }

    #[test]
    fn test_earliest_recovery_is_window_length_minus_one() {
        // even an instantly green pixel cannot recover before the first
        // full window closes
        assert_eq!(detect_series(&[1, 1, 1, 1]), 3);
    }

    #[test]
    fn test_baseline_is_median_minus_std() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(4, 1, 2, start);
        cube.fire.ignition = NaiveDate::from_ymd_opt(2001, 6, 1).unwrap();
        for (t, v) in [0.4, 0.6, 0.6, 0.8].into_iter().enumerate() {
            cube.ndvi[[t, 0, 0]] = v;
            cube.ndvi[[t, 0, 1]] = f32::NAN;
        }
        let params = RecoveryParams::default();
        let cube = compute_baseline(cube, &params);
        let b = cube.prefire_ndvi_baseline.as_ref().unwrap();

        // median 0.6, population std of [0.4,0.6,0.6,0.8]
        let std = (0.02_f32).sqrt();
        assert_relative_eq!(b[[0, 0]], 0.6 - std, epsilon = 1e-6);
        assert!(b[[0, 1]].is_nan());
    }

    #[test]
    fn test_baseline_detection_and_missing_baseline() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(10, 1, 2, start);
        // one pre-fire year at 0.6, then a dip and a recovery to 0.7
        cube.fire.ignition = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        for t in 0..10 {
            cube.ndvi[[t, 0, 0]] = if t < 4 {
                0.6
            } else if t < 6 {
                0.2
            } else {
                0.7
            };
            // second pixel has no pre-fire observations at all
            cube.ndvi[[t, 0, 1]] = if t < 5 { f32::NAN } else { 0.7 };
        }
        let params = RecoveryParams::default();
        let cube = compute_baseline(cube, &params);
        let cube = detect_baseline(cube, &params).unwrap();
        let rt = cube.prefire_baseline_recovery_time.as_ref().unwrap();

        // post-fire series starts at t=4: two below, then above from
        // index 2; first full window closes at index 5
        assert_eq!(rt[[0, 0]], 5);
        // no pre-fire observations, no baseline, never recovered
        assert_eq!(rt[[0, 1]], NEVER);
    }

    #[test]
    fn test_detection_requires_threshold() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let cube = synthetic_cube(4, 1, 1, start);
        assert!(detect_matched(cube, &RecoveryParams::default()).is_err());
    }
}
