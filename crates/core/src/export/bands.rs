//! Per-band GeoTIFF export
//!
//! Band names are the contract shared with the merge engine, which reads
//! these files back by the same names. Every band takes its nodata sentinel
//! from [`NodataPolicy::for_band`].

use ndarray::{Array2, Axis};
use std::path::Path;
use tracing::info;

use crate::core_types::fire::FirePaths;
use crate::core_types::nodata::{BandNodata, NodataPolicy};
use crate::core_types::raster::Raster;
use crate::cube::FireDataCube;
use crate::error::RecoveryError;
use crate::export::report::ExportReport;
use crate::io::geotiff;

fn band_export_error(band: &str, e: &RecoveryError) -> RecoveryError {
    RecoveryError::BandExport {
        band: band.to_string(),
        reason: e.to_string(),
    }
}

/// Export every attached layer of the cube as single-band GeoTIFFs under
/// the fire's output directory. Returns the per-band report; failures are
/// collected, never propagated.
#[must_use]
pub fn export_cube(cube: &FireDataCube, paths: &FirePaths) -> ExportReport {
    let prefix = cube.fire.prefix();
    let mut report = ExportReport::new(&prefix);

    let write_i8 = |report: &mut ExportReport, band: &str, data: &Array2<i8>| {
        let path = paths.band_path(&prefix, band);
        let nodata = match NodataPolicy::for_band(band) {
            BandNodata::I8(n) => n,
            _ => NodataPolicy::INT8_MASK,
        };
        let raster = Raster::new(data.clone(), cube.transform, Some(nodata));
        let outcome = geotiff::write_i8(&path, &raster)
            .map(|()| path)
            .map_err(|e| band_export_error(band, &e));
        report.record(band, outcome);
    };

    let i8_layers: [(&str, &Array2<i8>); 4] = [
        ("severity", &cube.severity),
        ("dist_mask", &cube.dist_mask),
        ("future_dist_agdev_mask", &cube.future_dist_agdev_mask),
        ("past_dist_agdev_mask", &cube.past_dist_agdev_mask),
    ];
    for (band, data) in i8_layers {
        write_i8(&mut report, band, data);
    }
    for (band, data) in [
        ("temporal_coverage_qa", &cube.temporal_coverage_qa),
        (
            "matched_group_temporal_coverage_qa",
            &cube.matched_group_temporal_coverage_qa,
        ),
    ] {
        if let Some(data) = data {
            write_i8(&mut report, band, data);
        }
    }

    let mut write_i32 = |band: &str, data: &Array2<i32>| {
        let path = paths.band_path(&prefix, band);
        let raster = Raster::new(data.clone(), cube.transform, Some(NodataPolicy::INT32));
        let outcome = geotiff::write_i32(&path, &raster)
            .map(|()| path)
            .map_err(|e| band_export_error(band, &e));
        report.record(band, outcome);
    };
    write_i32("groups", &cube.groups);
    for (band, data) in [
        ("fire_recovery_time", &cube.fire_recovery_time),
        (
            "prefire_baseline_recovery_time",
            &cube.prefire_baseline_recovery_time,
        ),
    ] {
        if let Some(data) = data {
            write_i32(band, data);
        }
    }

    if let Some(baseline) = &cube.prefire_ndvi_baseline {
        let band = "prefire_ndvi_baseline";
        let path = paths.band_path(&prefix, band);
        // NaN is in-memory missing; the sentinel is what goes on disk
        let data = baseline.mapv(|v| if v.is_nan() { NodataPolicy::FLOAT32 } else { v });
        let raster = Raster::new(data, cube.transform, Some(NodataPolicy::FLOAT32));
        let outcome = geotiff::write_f32(&path, &raster)
            .map(|()| path)
            .map_err(|e| band_export_error(band, &e));
        report.record(band, outcome);
    }

    info!(
        fire = %prefix,
        exported = report.exported(),
        failed = report.failures().count(),
        "band export finished"
    );
    report
}

/// Persist the classified threshold series as a multi-directory GeoTIFF,
/// one directory per season tagged with its date. An intermediate output
/// for auditing the classifier, written only when
/// `create_intermediate_outputs` is set.
///
/// # Errors
/// Fails when the threshold series has not been classified yet or the file
/// cannot be written.
pub fn write_threshold_series(cube: &FireDataCube, path: &Path) -> Result<(), RecoveryError> {
    let threshold = cube.threshold.as_ref().ok_or_else(|| {
        RecoveryError::Config("intermediate export requires the threshold series".into())
    })?;

    let dates: Vec<String> = cube.axis.dates().iter().map(ToString::to_string).collect();
    let layers: Vec<Array2<i8>> = (0..threshold.shape()[0])
        .map(|t| threshold.index_axis(Axis(0), t).to_owned())
        .collect();
    let bands: Vec<(&str, &Array2<i8>)> = dates
        .iter()
        .map(String::as_str)
        .zip(layers.iter())
        .collect();
    geotiff::write_multiband_i8(path, &bands, &cube.transform, NodataPolicy::INT8_MASK)
}
