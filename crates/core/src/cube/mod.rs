//! Per-fire spatiotemporal data cube
//!
//! The [`FireDataCube`] is the unit of work for one fire: a seasonal NDVI
//! stack aligned with the static layers (severity, disturbance history,
//! matched groups), progressively enriched by the downstream phases. Each
//! phase takes the cube by value and returns it with one more layer
//! attached, so phases can be unit-tested independently and must run in
//! pipeline order.

pub mod align;
pub mod assembler;
pub mod disturbance;
pub mod grouping;

use chrono::NaiveDate;
use ndarray::{Array2, Array3};
use std::ops::Range;

use crate::core_types::fire::FireMetadata;
use crate::core_types::raster::GeoTransform;
use crate::core_types::season::SeasonalAxis;

pub use assembler::assemble;

/// Aligned spatiotemporal arrays for one fire. All 3D arrays are
/// (time, y, x); all 2D arrays share the same (y, x) grid.
#[derive(Debug, Clone)]
pub struct FireDataCube {
    pub fire: FireMetadata,
    pub axis: SeasonalAxis,
    pub transform: GeoTransform,

    /// Vegetation index; NaN = missing or out of valid range
    pub ndvi: Array3<f32>,
    /// Refined matched-group ids; `NodataPolicy::INT32` = no group
    pub groups: Array2<i32>,
    /// Burn severity: 0 unburned/invalid, 2/3/4 low/medium/high
    pub severity: Array2<i8>,
    /// Any-time disturbance or agriculture/development overlap
    pub dist_mask: Array2<i8>,
    /// Post-fire disturbance or agriculture/development overlap
    pub future_dist_agdev_mask: Array2<i8>,
    /// Pre-fire disturbance or agriculture/development overlap
    pub past_dist_agdev_mask: Array2<i8>,

    // Layers attached by later phases
    /// Ternary threshold series (see `threshold_state`), from the classifier
    pub threshold: Option<Array3<i8>>,
    /// 1 = too few NDVI observations around the fire date
    pub temporal_coverage_qa: Option<Array2<i8>>,
    /// 1 = matched group too sparsely valid around the fire date
    pub matched_group_temporal_coverage_qa: Option<Array2<i8>>,
    /// Season index of first sustained recovery; `NodataPolicy::INT32` = never
    pub fire_recovery_time: Option<Array2<i32>>,
    /// Per-pixel pre-fire baseline (median − std of own pre-fire series)
    pub prefire_ndvi_baseline: Option<Array2<f32>>,
    /// Recovery vs. the pixel's own pre-fire baseline
    pub prefire_baseline_recovery_time: Option<Array2<i32>>,
}

impl FireDataCube {
    /// (time, rows, cols) of the cube.
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        let s = self.ndvi.shape();
        (s[0], s[1], s[2])
    }

    /// Time indices from ignition forward.
    #[must_use]
    pub fn postfire_range(&self) -> Range<usize> {
        self.axis.from_date(self.fire.ignition)
    }

    /// Time indices of the matching/QA window: `yrs_prefire` years before
    /// ignition through `yrs_postfire` years after.
    #[must_use]
    pub fn matching_window(&self, yrs_prefire: i64, yrs_postfire: i64) -> Range<usize> {
        let start = self.fire.ignition - chrono::Duration::weeks(52 * yrs_prefire);
        let end = self.fire.ignition + chrono::Duration::weeks(52 * yrs_postfire);
        self.axis.window(start, end)
    }

    /// Ignition date shortcut.
    #[must_use]
    pub fn ignition(&self) -> NaiveDate {
        self.fire.ignition
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Small synthetic cubes for phase unit tests.

    use super::*;
    use crate::core_types::nodata::NodataPolicy;

    use chrono::Datelike;

    /// Cube with `t` quarterly steps starting at `start`, all layers valid,
    /// one uniform matched group and uniform severity 2.
    pub fn synthetic_cube(t: usize, rows: usize, cols: usize, start: NaiveDate) -> FireDataCube {
        let dates: Vec<NaiveDate> = (0..t)
            .map(|i| {
                let months = start.month0() + i as u32 * 3;
                let year = start.year() + (months / 12) as i32;
                let month = months % 12 + 1;
                NaiveDate::from_ymd_opt(year, month, 1).unwrap()
            })
            .collect();

        FireDataCube {
            fire: FireMetadata {
                name: "TESTFIRE".to_string(),
                fire_id: "t1".to_string(),
                ignition: dates[0],
                sensitivity_analysis: false,
            },
            axis: SeasonalAxis::new(dates),
            transform: GeoTransform::new(0.0, rows as f64 * 30.0, 30.0, -30.0),
            ndvi: Array3::from_elem((t, rows, cols), 0.5),
            groups: Array2::from_elem((rows, cols), 11_050),
            severity: Array2::from_elem((rows, cols), 2),
            dist_mask: Array2::zeros((rows, cols)),
            future_dist_agdev_mask: Array2::zeros((rows, cols)),
            past_dist_agdev_mask: Array2::zeros((rows, cols)),
            threshold: None,
            temporal_coverage_qa: None,
            matched_group_temporal_coverage_qa: None,
            fire_recovery_time: None,
            prefire_ndvi_baseline: None,
            prefire_baseline_recovery_time: None,
        }
    }

    /// Never-recovered sentinel for recovery grids in tests.
    pub const NEVER: i32 = NodataPolicy::INT32;
}
