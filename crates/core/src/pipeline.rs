//! Per-fire pipeline driver
//!
//! Runs the phases in their only valid order — assemble, statistics,
//! classify, QA, detect, export — threading the cube through by value.
//! A failure anywhere before export aborts this fire only; the caller
//! decides whether to continue with other fires.

use tracing::{info, warn};

use crate::core_types::config::RecoveryParams;
use crate::core_types::fire::FireManifest;
use crate::cube;
use crate::error::RecoveryError;
use crate::export::{self, ExportReport};
use crate::qa;
use crate::recovery;
use crate::stats;
use crate::threshold;

/// Run the full recovery pipeline for one fire and export its outputs.
///
/// # Errors
/// Fails when the cube cannot be assembled or a phase prerequisite is
/// missing. Individual band-export failures are carried in the returned
/// report instead.
pub fn process_fire(
    manifest: &FireManifest,
    params: &RecoveryParams,
) -> Result<ExportReport, RecoveryError> {
    let prefix = manifest.metadata.prefix();
    info!(fire = %prefix, "processing fire");

    let cube = cube::assemble(manifest, params)?;
    let table = stats::compute(&cube);
    table.write_csv(&manifest.paths.stats_csv_path(&prefix))?;

    let cube = threshold::classify(cube, &table, params);
    if params.create_intermediate_outputs {
        let path = manifest.paths.band_path(&prefix, "threshold_series");
        // intermediate only: a write failure never aborts the fire
        if let Err(e) = export::write_threshold_series(&cube, &path) {
            warn!(fire = %prefix, error = %e, "threshold series not written");
        }
    }
    let cube = qa::apply(cube, params)?;
    let cube = recovery::detect_matched(cube, params)?;
    let cube = recovery::compute_baseline(cube, params);
    let cube = recovery::detect_baseline(cube, params)?;

    export::write_recovery_summary(&cube, &manifest.paths.summary_csv_path(&prefix))?;
    let report = export::export_cube(&cube, &manifest.paths);
    info!(
        fire = %prefix,
        bands = report.exported(),
        complete = report.is_complete(),
        "fire processed"
    );
    Ok(report)
}
