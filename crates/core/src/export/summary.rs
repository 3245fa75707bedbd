//! Per-fire recovery-count summary
//!
//! Long-format CSV of how many burned pixels of each (severity class,
//! matched group) recovered after each number of seasons. Pixels disturbed
//! after the fire or failing either coverage-QA check are excluded;
//! never-recovered pixels are reported under recovery time −1.

use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::core_types::nodata::NodataPolicy;
use crate::cube::FireDataCube;
use crate::error::RecoveryError;

/// Recovery time bucket reported for pixels that never recovered.
const NEVER_RECOVERED_BUCKET: i32 = -1;

/// Write the recovery-count summary CSV for a fully processed cube.
///
/// # Errors
/// Fails when the detector has not run yet or the file cannot be written.
pub fn write_recovery_summary(cube: &FireDataCube, path: &Path) -> Result<(), RecoveryError> {
    let recovery = cube
        .fire_recovery_time
        .as_ref()
        .ok_or_else(|| RecoveryError::Config("summary requires detected recovery times".into()))?;
    let qa = cube
        .temporal_coverage_qa
        .as_ref()
        .ok_or_else(|| RecoveryError::Config("summary requires coverage QA".into()))?;
    let group_qa = cube
        .matched_group_temporal_coverage_qa
        .as_ref()
        .ok_or_else(|| RecoveryError::Config("summary requires matched-group QA".into()))?;

    let (_, rows, cols) = cube.shape();
    let mut counts: FxHashMap<(i8, i32, i32), usize> = FxHashMap::default();
    for row in 0..rows {
        for col in 0..cols {
            let severity = cube.severity[[row, col]];
            let group = cube.groups[[row, col]];
            if severity < 2 || group <= 0 {
                continue;
            }
            // QA flags and post-fire disturbance combine with OR
            if cube.future_dist_agdev_mask[[row, col]] == 1
                || qa[[row, col]] == 1
                || group_qa[[row, col]] == 1
            {
                continue;
            }
            let time = recovery[[row, col]];
            let bucket = if time == NodataPolicy::INT32 {
                NEVER_RECOVERED_BUCKET
            } else {
                time
            };
            *counts.entry((severity, group, bucket)).or_insert(0) += 1;
        }
    }

    let mut keys: Vec<(i8, i32, i32)> = counts.keys().copied().collect();
    keys.sort_unstable();

    let file = File::create(path).map_err(|e| RecoveryError::io(path, e))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "fire,ignition,severity,group,recovery_seasons,count")
        .map_err(|e| RecoveryError::io(path, e))?;
    for (severity, group, bucket) in keys {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            cube.fire.prefix(),
            cube.fire.ignition,
            severity,
            group,
            bucket,
            counts[&(severity, group, bucket)]
        )
        .map_err(|e| RecoveryError::io(path, e))?;
    }
    debug!(fire = %cube.fire.prefix(), "recovery summary written");
    Ok(())
}
