//! Matched-group snapshot selection and NDVI-quantile refinement
//!
//! Base groups encode vegetation type and elevation band. The refinement
//! appends a pre-fire NDVI quantile bin so that a burned pixel is compared
//! only against undisturbed pixels that looked similar before the fire:
//! `refined = base * 1000 + round(upper_bin_edge * 100)`.

use chrono::Duration;
use ndarray::{Array2, Array3};
use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::core_types::config::RecoveryParams;
use crate::core_types::fire::FireMetadata;
use crate::core_types::nodata::NodataPolicy;
use crate::core_types::season::SeasonalAxis;
use crate::cube::align::{ensure_alignable, resample_nearest, GridSpec};
use crate::error::RecoveryError;
use crate::io;
use crate::io::geotiff;

/// Pick the most recent pre-fire snapshot from the annual grouping stack
/// and align it to the template. Fires in the stack's earliest year have no
/// earlier snapshot and fall back to the first available one (a slightly
/// later reference).
///
/// # Errors
/// Fails when the directory holds no usable snapshot or the chosen layer
/// cannot be aligned.
pub fn load_group_snapshot(
    dir: &Path,
    fire: &FireMetadata,
    template: &GridSpec,
) -> Result<Array2<i32>, RecoveryError> {
    let mut by_year: Vec<(i32, std::path::PathBuf)> = Vec::new();
    for path in io::list_files_with_suffix(dir, ".tif")? {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(token) = stem.rsplit('_').next() else {
            continue;
        };
        if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(year) = token.parse() {
                by_year.push((year, path));
            }
        }
    }
    by_year.sort();

    if by_year.is_empty() {
        return Err(RecoveryError::LayerAlignment {
            layer: "groupings".to_string(),
            reason: format!("no annual snapshots under {}", dir.display()),
        });
    }

    let fire_year = fire.ignition_year();
    let chosen = by_year
        .iter()
        .rev()
        .find(|(year, _)| *year < fire_year)
        .unwrap_or_else(|| {
            // earliest-fire-year special case: no pre-fire snapshot exists
            warn!(
                fire = %fire.prefix(),
                fire_year,
                "no pre-fire grouping snapshot; using earliest available"
            );
            &by_year[0]
        });
    debug!(fire = %fire.prefix(), snapshot_year = chosen.0, "grouping snapshot selected");

    let raster = geotiff::read_i32(&chosen.1)?;
    ensure_alignable("groupings", &raster, template)?;
    let nodata = raster.nodata.unwrap_or(0);
    let mut aligned = resample_nearest(&raster, template, 0);
    // nodata group values collapse to the reserved group 0
    aligned.mapv_inplace(|v| if v == nodata || v < 0 { 0 } else { v });
    Ok(aligned)
}

/// Linear-interpolation quantile of an already sorted, non-empty slice.
fn quantile_sorted(sorted: &[f32], q: f64) -> f32 {
    let last = sorted.len() - 1;
    let rank = q * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let w = (rank - lo as f64) as f32;
        sorted[lo] + (sorted[hi] - sorted[lo]) * w
    }
}

/// Refine base groups with a pre-fire NDVI quantile bin.
///
/// For each base group, the distribution of its members' median pre-fire
/// NDVI (over `yrs_prefire_matched` years before ignition) is cut into
/// `num_ndvi_groups` quantile bins. Edges are clamped to the valid NDVI
/// range; the first bin is closed on both ends, later bins are `(lo, hi]`.
/// Pixels with no valid pre-fire median, and base group 0, stay at the
/// group nodata sentinel.
#[must_use]
pub fn refine_groups(
    ndvi: &Array3<f32>,
    axis: &SeasonalAxis,
    base_groups: &Array2<i32>,
    fire: &FireMetadata,
    params: &RecoveryParams,
) -> Array2<i32> {
    let (rows, cols) = (base_groups.shape()[0], base_groups.shape()[1]);
    let prefire_end = fire.ignition;
    let prefire_start = prefire_end - Duration::weeks(52 * params.yrs_prefire_matched);
    let window = axis.window(prefire_start, prefire_end);

    // per-pixel median of valid pre-fire NDVI
    let mut median = Array2::from_elem((rows, cols), f32::NAN);
    let mut scratch: Vec<f32> = Vec::with_capacity(window.len());
    for row in 0..rows {
        for col in 0..cols {
            scratch.clear();
            for t in window.clone() {
                let v = ndvi[[t, row, col]];
                if params.ndvi_in_range(v) {
                    scratch.push(v);
                }
            }
            if !scratch.is_empty() {
                scratch.sort_unstable_by(f32::total_cmp);
                median[[row, col]] = quantile_sorted(&scratch, 0.5);
            }
        }
    }

    // collect each base group's median distribution
    let mut members: FxHashMap<i32, Vec<f32>> = FxHashMap::default();
    for row in 0..rows {
        for col in 0..cols {
            let base = base_groups[[row, col]];
            let m = median[[row, col]];
            if base > 0 && !m.is_nan() {
                members.entry(base).or_default().push(m);
            }
        }
    }

    // quantile bin edges per base group, clamped to the valid NDVI range
    let mut edges: FxHashMap<i32, Vec<f32>> = FxHashMap::default();
    for (base, mut vals) in members {
        vals.sort_unstable_by(f32::total_cmp);
        let n = params.num_ndvi_groups;
        let mut e: Vec<f32> = (0..=n)
            .map(|i| quantile_sorted(&vals, i as f64 / n as f64))
            .collect();
        e[0] = params.ndvi_lower_bound;
        e[n] = params.ndvi_upper_bound;
        debug!(base, ?e, "ndvi quantile edges");
        edges.insert(base, e);
    }

    let mut refined = Array2::from_elem((rows, cols), NodataPolicy::INT32);
    for row in 0..rows {
        for col in 0..cols {
            let base = base_groups[[row, col]];
            let m = median[[row, col]];
            if base <= 0 || m.is_nan() {
                continue;
            }
            let Some(e) = edges.get(&base) else { continue };
            for i in 0..params.num_ndvi_groups {
                let in_bin = if i == 0 {
                    m >= e[0] && m <= e[1]
                } else {
                    m > e[i] && m <= e[i + 1]
                };
                if in_bin {
                    let cents = (f64::from(e[i + 1]) * 100.0).round() as i32;
                    refined[[row, col]] = base * 1000 + cents;
                    break;
                }
            }
        }
    }
    refined
}
