//! Core types and utilities

pub mod config;
pub mod fire;
pub mod nodata;
pub mod raster;
pub mod season;

pub use config::RecoveryParams;
pub use fire::{FireManifest, FireMetadata, FirePaths};
pub use nodata::{threshold_state, NodataPolicy};
pub use raster::{GeoTransform, Raster};
pub use season::SeasonalAxis;
