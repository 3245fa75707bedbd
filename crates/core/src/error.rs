//! Error taxonomy for the recovery pipeline
//!
//! Three failure classes exist: fatal per-fire errors (a static layer cannot
//! be loaded or aligned — the fire is skipped, other fires are unaffected),
//! export-local errors (one output band fails to write — carried as data in
//! the per-fire `ExportReport`), and the merge-barrier timeout. Insufficient
//! matched samples at a (group, date) is *not* an error: it is encoded as the
//! group-invalidated sentinel and the pipeline continues.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the recovery pipeline and merge engine.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// A required static layer is missing or cannot be aligned to the
    /// fire's template grid. Fatal for that fire only.
    #[error("layer '{layer}' cannot be aligned to the template grid: {reason}")]
    LayerAlignment { layer: String, reason: String },

    /// No seasonal vegetation-index rasters were found for a fire.
    #[error("no seasonal rasters found under {}", .0.display())]
    EmptySeasonalStack(PathBuf),

    /// A single output band failed to export. Collected into the per-fire
    /// export report rather than aborting the remaining bands.
    #[error("band '{band}' failed to export: {reason}")]
    BandExport { band: String, reason: String },

    /// The final-reduction barrier gave up waiting for batch outputs.
    #[error("merge barrier timed out: {found} of {expected} batch outputs after {waited_secs}s")]
    BarrierTimeout {
        expected: usize,
        found: usize,
        waited_secs: u64,
    },

    /// A raster file could not be decoded.
    #[error("failed to decode raster {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    /// A raster file could not be encoded.
    #[error("failed to encode raster {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    /// Underlying filesystem error.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed configuration or manifest.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RecoveryError {
    /// Attach a path to a bare IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
