//! Fire metadata and per-fire file manifest
//!
//! Produced by the external configuration-generation step as one JSON file
//! mapping fire id → metadata + paths. The pipeline only reads it.

use chrono::{Datelike, NaiveDate};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RecoveryError;

/// Identity and timing of one fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireMetadata {
    /// Human-readable fire name
    pub name: String,
    /// Stable fire identifier from the fire registry
    pub fire_id: String,
    /// Ignition date
    pub ignition: NaiveDate,
    /// Included in the parameter sensitivity analysis
    #[serde(default)]
    pub sensitivity_analysis: bool,
}

impl FireMetadata {
    /// `name_fireid` prefix used for every per-fire output file.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}_{}", self.name, self.fire_id)
    }

    #[must_use]
    pub fn ignition_year(&self) -> i32 {
        self.ignition.year()
    }
}

/// Input and output locations for one fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirePaths {
    /// Directory of seasonal vegetation-index GeoTIFFs (`YYYYS_*.tif`)
    pub seasonal_dir: PathBuf,
    /// Burn-severity raster for this fire
    pub severity: PathBuf,
    /// Agriculture/development mask raster
    pub agdev_mask: PathBuf,
    /// Directory of annual disturbance rasters (`dist_YYYY.tif`)
    pub disturbance_dir: PathBuf,
    /// Directory of annual matched-group rasters (`groups_YYYY.tif`)
    pub groupings_dir: PathBuf,
    /// Directory receiving all per-fire outputs
    pub output_dir: PathBuf,
}

impl FirePaths {
    /// Path of a named per-fire output band.
    #[must_use]
    pub fn band_path(&self, prefix: &str, band: &str) -> PathBuf {
        self.output_dir.join(format!("{prefix}_{band}.tif"))
    }

    /// Path of the per-fire recovery-count summary CSV.
    #[must_use]
    pub fn summary_csv_path(&self, prefix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{prefix}_grouping_counts_recovery_summary.csv"))
    }

    /// Path of the matched-group statistics table CSV.
    #[must_use]
    pub fn stats_csv_path(&self, prefix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{prefix}_time_series_summary.csv"))
    }
}

/// One fire's entry in the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireManifest {
    pub metadata: FireMetadata,
    pub paths: FirePaths,
}

/// Load the full run manifest (fire id → entry) from JSON.
///
/// # Errors
/// Returns [`RecoveryError::Config`] when the file cannot be read or parsed.
pub fn load_manifest<P: AsRef<Path>>(
    path: P,
) -> Result<FxHashMap<String, FireManifest>, RecoveryError> {
    let contents = fs::read_to_string(&path)
        .map_err(|e| RecoveryError::Config(format!("cannot read manifest: {e}")))?;
    serde_json::from_str(&contents)
        .map_err(|e| RecoveryError::Config(format!("cannot parse manifest: {e}")))
}

/// Fires ordered oldest-to-newest by ignition date, ties broken by fire id
/// so UID assignment is deterministic across processes.
#[must_use]
pub fn chronological_order(manifest: &FxHashMap<String, FireManifest>) -> Vec<&FireManifest> {
    let mut fires: Vec<&FireManifest> = manifest.values().collect();
    fires.sort_by(|a, b| {
        a.metadata
            .ignition
            .cmp(&b.metadata.ignition)
            .then_with(|| a.metadata.fire_id.cmp(&b.metadata.fire_id))
    });
    fires
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, id: &str, ignition: NaiveDate) -> FireManifest {
        FireManifest {
            metadata: FireMetadata {
                name: name.to_string(),
                fire_id: id.to_string(),
                ignition,
                sensitivity_analysis: false,
            },
            paths: FirePaths {
                seasonal_dir: PathBuf::from("/tmp/seasonal"),
                severity: PathBuf::from("/tmp/sev.tif"),
                agdev_mask: PathBuf::from("/tmp/agdev.tif"),
                disturbance_dir: PathBuf::from("/tmp/dist"),
                groupings_dir: PathBuf::from("/tmp/groups"),
                output_dir: PathBuf::from("/tmp/out"),
            },
        }
    }

    #[test]
    fn test_chronological_order_is_deterministic() {
        let mut manifest = FxHashMap::default();
        let d = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        manifest.insert("b".to_string(), entry("beta", "b", d(2005, 6)));
        manifest.insert("a".to_string(), entry("alpha", "a", d(2005, 6)));
        manifest.insert("c".to_string(), entry("gamma", "c", d(1999, 8)));

        let ordered = chronological_order(&manifest);
        let ids: Vec<&str> = ordered.iter().map(|f| f.metadata.fire_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_prefix_and_band_path() {
        let e = entry("CAMPFIRE", "f123", NaiveDate::from_ymd_opt(2018, 11, 8).unwrap());
        assert_eq!(e.metadata.prefix(), "CAMPFIRE_f123");
        let p = e.paths.band_path(&e.metadata.prefix(), "severity");
        assert!(p.ends_with("CAMPFIRE_f123_severity.tif"));
    }
}
