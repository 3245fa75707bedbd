//! Statewide merge engine
//!
//! Two-phase composite of thousands of per-fire results into one int8
//! mosaic. Fires are ordered oldest-to-newest and given dense UIDs; batch
//! jobs each own a contiguous UID range and write per-band single-layer
//! mosaics; the final reduction waits for every batch, merges them
//! last-wins in UID order, and writes the multi-band output. Later fires
//! overwrite earlier fires at shared pixels, never the reverse.

pub mod bands;
pub mod barrier;
pub mod distance;
pub mod mosaic;
pub mod uid;

pub use bands::{band_index, MosaicBand, MOSAIC_BANDS, NUM_BANDS};
pub use barrier::{await_batch_outputs, BarrierConfig};
pub use mosaic::{final_reduction, merge_batch, FireContribution, MergedStateRaster};
pub use uid::{assign_uids, PackedUid};
