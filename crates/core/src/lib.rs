//! Post-Fire Vegetation Recovery Core Library
//!
//! Estimates, per pixel, how long post-fire vegetation takes to return to a
//! pre-fire photosynthetic baseline from a multi-decade seasonal
//! vegetation-index time series, then merges thousands of per-fire results
//! into one byte-packed statewide mosaic.
//!
//! Pipeline (one fire, strict order, each phase takes and returns the cube):
//! assembler → matched-group statistics → threshold classifier → temporal
//! coverage QA → recovery detector → per-band export. The merge engine runs
//! afterwards over the exported per-fire rasters, fire-by-fire in
//! chronological order.

// Core types and utilities
pub mod core_types;

// Per-fire pipeline stages
pub mod cube;
pub mod qa;
pub mod recovery;
pub mod stats;
pub mod threshold;

// Per-fire outputs and the statewide merge engine
pub mod export;
pub mod merge;
pub mod pipeline;

// Raster I/O
pub mod io;

pub mod error;

// Re-export core types
pub use core_types::{
    FireMetadata, FirePaths, GeoTransform, NodataPolicy, Raster, RecoveryParams, SeasonalAxis,
};

// Re-export pipeline entry points
pub use cube::FireDataCube;
pub use error::RecoveryError;
pub use merge::{MergedStateRaster, MosaicBand};
pub use pipeline::process_fire;
pub use stats::{MaskCategory, SummaryTable};
