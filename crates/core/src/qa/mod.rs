//! Temporal-coverage quality assurance
//!
//! Recovery timing is only meaningful for pixels observed often enough
//! around the fire. Over the window from `yrs_prefire_matched` years before
//! ignition to ten years after, two per-pixel flags are derived: one from
//! the raw NDVI series and one from the classified threshold series (which
//! additionally requires the pixel's matched group to have been
//! trustworthy). A pixel passes only when its observation count strictly
//! exceeds `min_temporal_coverage_ratio` of the window's seasons.

use ndarray::Array2;
use tracing::debug;

use crate::core_types::config::RecoveryParams;
use crate::cube::FireDataCube;
use crate::error::RecoveryError;

/// Years of post-fire data included in the coverage window.
const YRS_POSTFIRE_QA: i64 = 10;

/// Attach both coverage-QA layers to the cube. Flag value 1 marks a pixel
/// with insufficient coverage, 0 a pixel that passed.
///
/// # Errors
/// Fails when the threshold series has not been classified yet.
pub fn apply(mut cube: FireDataCube, params: &RecoveryParams) -> Result<FireDataCube, RecoveryError> {
    let threshold = cube
        .threshold
        .as_ref()
        .ok_or_else(|| RecoveryError::Config("coverage QA requires the threshold series".into()))?;

    let window = cube.matching_window(params.yrs_prefire_matched, YRS_POSTFIRE_QA);
    let total = window.len();
    let required = params.min_temporal_coverage_ratio * total as f64;
    let (_, rows, cols) = cube.shape();

    let mut ndvi_qa = Array2::zeros((rows, cols));
    let mut group_qa = Array2::zeros((rows, cols));
    for row in 0..rows {
        for col in 0..cols {
            let mut observed = 0usize;
            let mut classified = 0usize;
            for t in window.clone() {
                if !cube.ndvi[[t, row, col]].is_nan() {
                    observed += 1;
                }
                if threshold[[t, row, col]] >= 0 {
                    classified += 1;
                }
            }
            // strictly-greater: a pixel at exactly the ratio fails
            ndvi_qa[[row, col]] = i8::from(observed as f64 <= required);
            group_qa[[row, col]] = i8::from(classified as f64 <= required);
        }
    }

    debug!(
        fire = %cube.fire.prefix(),
        window_seasons = total,
        "coverage QA computed"
    );
    cube.temporal_coverage_qa = Some(ndvi_qa);
    cube.matched_group_temporal_coverage_qa = Some(group_qa);
    Ok(cube)
}
