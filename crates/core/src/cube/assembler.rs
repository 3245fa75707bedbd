//! Cube assembly
//!
//! Builds the full [`FireDataCube`] for one fire from its manifest entry:
//! the seasonal NDVI stack defines the template grid and time axis, then
//! severity, agriculture/development, disturbance history and matched
//! groups are aligned onto it.

use ndarray::{Array2, Array3};
use tracing::{debug, info};

use crate::core_types::config::RecoveryParams;
use crate::core_types::fire::FireManifest;
use crate::core_types::season::{parse_seasonal_filename, SeasonalAxis};
use crate::cube::align::{ensure_alignable, resample_bilinear, resample_nearest, GridSpec};
use crate::cube::disturbance::DisturbanceStack;
use crate::cube::grouping::{load_group_snapshot, refine_groups};
use crate::cube::FireDataCube;
use crate::error::RecoveryError;
use crate::io;
use crate::io::geotiff;

/// Assemble the aligned data cube for one fire.
///
/// The first seasonal raster (by date) is the template: every other layer
/// is resampled onto its grid. NDVI outside the configured valid range
/// becomes NaN; severity classes outside 2..=4 collapse to 0 (unburned).
///
/// # Errors
/// Fails when the seasonal directory holds no parseable rasters, when any
/// layer cannot be read, or when a static layer does not intersect the
/// template grid.
pub fn assemble(
    manifest: &FireManifest,
    params: &RecoveryParams,
) -> Result<FireDataCube, RecoveryError> {
    let fire = &manifest.metadata;
    let paths = &manifest.paths;

    let mut seasonal: Vec<(chrono::NaiveDate, std::path::PathBuf)> = Vec::new();
    for path in io::list_files_with_suffix(&paths.seasonal_dir, ".tif")? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date) = parse_seasonal_filename(name, params) {
            seasonal.push((date, path));
        }
    }
    seasonal.sort();
    if seasonal.is_empty() {
        return Err(RecoveryError::EmptySeasonalStack(paths.seasonal_dir.clone()));
    }

    let first = geotiff::read_f32(&seasonal[0].1)?;
    let template = GridSpec::of(&first);
    info!(
        fire = %fire.prefix(),
        seasons = seasonal.len(),
        rows = template.rows,
        cols = template.cols,
        "assembling data cube"
    );

    let t = seasonal.len();
    let mut ndvi = Array3::from_elem((t, template.rows, template.cols), f32::NAN);
    for (i, (date, path)) in seasonal.iter().enumerate() {
        let raster = if i == 0 {
            first.clone()
        } else {
            geotiff::read_f32(path)?
        };
        ensure_alignable(&format!("seasonal {date}"), &raster, &template)?;
        let mut layer = resample_bilinear(&raster, &template);
        layer.mapv_inplace(|v| if params.ndvi_in_range(v) { v } else { f32::NAN });
        ndvi.index_axis_mut(ndarray::Axis(0), i).assign(&layer);
    }
    let axis = SeasonalAxis::new(seasonal.iter().map(|(d, _)| *d).collect());

    let severity = load_severity(manifest, &template)?;
    let agdev = load_agdev(manifest, &template)?;

    let stack = DisturbanceStack::load(&paths.disturbance_dir, &template)?;
    let fire_year = fire.ignition_year();
    let dist_mask = stack.cumulative(&agdev);
    let future_dist_agdev_mask = stack.postfire(&agdev, fire_year);
    let past_dist_agdev_mask = stack.prefire(&agdev, fire_year);

    let base_groups = load_group_snapshot(&paths.groupings_dir, fire, &template)?;
    let groups = refine_groups(&ndvi, &axis, &base_groups, fire, params);
    debug!(fire = %fire.prefix(), "data cube assembled");

    Ok(FireDataCube {
        fire: fire.clone(),
        axis,
        transform: template.transform,
        ndvi,
        groups,
        severity,
        dist_mask,
        future_dist_agdev_mask,
        past_dist_agdev_mask,
        threshold: None,
        temporal_coverage_qa: None,
        matched_group_temporal_coverage_qa: None,
        fire_recovery_time: None,
        prefire_ndvi_baseline: None,
        prefire_baseline_recovery_time: None,
    })
}

/// Severity classes are 2/3/4 (low/medium/high); everything else,
/// including the nodata value, is 0 (unburned or invalid).
fn load_severity(
    manifest: &FireManifest,
    template: &GridSpec,
) -> Result<Array2<i8>, RecoveryError> {
    let raster = geotiff::read_i32(&manifest.paths.severity)?;
    ensure_alignable("severity", &raster, template)?;
    let nodata = raster.nodata.unwrap_or(i32::MIN);
    let aligned = resample_nearest(&raster, template, nodata);
    Ok(aligned.mapv(|v| if v == nodata || !(2..=4).contains(&v) { 0 } else { v as i8 }))
}

/// The agriculture/development mask binarizes to presence/absence.
fn load_agdev(manifest: &FireManifest, template: &GridSpec) -> Result<Array2<i8>, RecoveryError> {
    let raster = geotiff::read_i8(&manifest.paths.agdev_mask)?;
    ensure_alignable("agdev mask", &raster, template)?;
    let nodata = raster.nodata.unwrap_or(0);
    let aligned = resample_nearest(&raster, template, 0);
    Ok(aligned.mapv(|v| i8::from(v != nodata && v > 0)))
}
