//! Disturbance history indicators
//!
//! The annual disturbance stack is a directory of rasters named
//! `*_YYYY.tif`. Three boolean-like indicators are derived by taking the
//! max across the relevant year slices and unioning the result with the
//! agriculture/development mask: any-time (`dist_mask`), pre-fire and
//! post-fire.

use ndarray::Array2;
use std::path::Path;

use crate::cube::align::{ensure_alignable, resample_nearest, GridSpec};
use crate::error::RecoveryError;
use crate::io;
use crate::io::geotiff;

/// Annual disturbance layers keyed by year, aligned to the template grid.
#[derive(Debug)]
pub struct DisturbanceStack {
    years: Vec<i32>,
    layers: Vec<Array2<i8>>,
}

/// Parse the trailing `_YYYY` of a raster file name.
fn year_of(path: &Path) -> Option<i32> {
    let stem = path.file_stem()?.to_str()?;
    let token = stem.rsplit('_').next()?;
    if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

impl DisturbanceStack {
    /// Load every annual layer under `dir` and align it to the template.
    ///
    /// # Errors
    /// Fails when the directory cannot be read or a layer cannot be
    /// aligned; both abort cube construction for the fire.
    pub fn load(dir: &Path, template: &GridSpec) -> Result<Self, RecoveryError> {
        let mut years = Vec::new();
        let mut layers = Vec::new();

        for path in io::list_files_with_suffix(dir, ".tif")? {
            let Some(year) = year_of(&path) else {
                continue;
            };
            let raster = geotiff::read_i8(&path)?;
            ensure_alignable(&format!("disturbance {year}"), &raster, template)?;
            years.push(year);
            layers.push(resample_nearest(&raster, template, 0));
        }

        if years.is_empty() {
            return Err(RecoveryError::LayerAlignment {
                layer: "disturbance".to_string(),
                reason: format!("no annual layers under {}", dir.display()),
            });
        }
        Ok(Self { years, layers })
    }

    /// Max across the layers whose year satisfies `keep`, unioned with the
    /// agdev mask and binarized.
    fn indicator<F: Fn(i32) -> bool>(&self, agdev: &Array2<i8>, keep: F) -> Array2<i8> {
        let mut out = agdev.mapv(|v| i8::from(v > 0));
        for (year, layer) in self.years.iter().zip(&self.layers) {
            if !keep(*year) {
                continue;
            }
            for (cell, v) in out.iter_mut().zip(layer.iter()) {
                if *v > 0 {
                    *cell = 1;
                }
            }
        }
        out
    }

    /// Any-time disturbance or agriculture/development.
    #[must_use]
    pub fn cumulative(&self, agdev: &Array2<i8>) -> Array2<i8> {
        self.indicator(agdev, |_| true)
    }

    /// Disturbance strictly before the fire year, plus agdev.
    #[must_use]
    pub fn prefire(&self, agdev: &Array2<i8>, fire_year: i32) -> Array2<i8> {
        self.indicator(agdev, |y| y <= fire_year - 1)
    }

    /// Disturbance strictly after the fire year, plus agdev.
    #[must_use]
    pub fn postfire(&self, agdev: &Array2<i8>, fire_year: i32) -> Array2<i8> {
        self.indicator(agdev, |y| y >= fire_year + 1)
    }
}
