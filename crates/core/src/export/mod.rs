//! Per-fire persistent outputs
//!
//! Once the pipeline has run, every attached cube layer is exported as a
//! single-band GeoTIFF next to a long-format recovery-count CSV. Band
//! exports are independent: one band failing to write is recorded in the
//! fire's [`ExportReport`] and never blocks the others.

pub mod bands;
pub mod report;
pub mod summary;

pub use bands::{export_cube, write_threshold_series};
pub use report::{BandOutcome, ExportReport};
pub use summary::write_recovery_summary;
