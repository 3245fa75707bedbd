//! Grid alignment and resampling
//!
//! Every static layer is resampled onto the template grid of the fire's
//! first seasonal raster. Categorical layers (severity, masks, groups) use
//! nearest-neighbor so class values are never invented; the continuous NDVI
//! stack uses bilinear. A layer that does not intersect the template at all
//! is unresolvable and aborts cube construction for that fire.

use ndarray::Array2;

use crate::core_types::raster::{GeoTransform, Raster};
use crate::error::RecoveryError;

/// Shape and georeferencing of the alignment template.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
}

impl GridSpec {
    #[must_use]
    pub fn of<T: Copy>(raster: &Raster<T>) -> Self {
        let (rows, cols) = raster.shape();
        Self {
            rows,
            cols,
            transform: raster.transform,
        }
    }
}

/// Verify that `src` can be placed on the template at all.
///
/// # Errors
/// Returns [`RecoveryError::LayerAlignment`] when the source does not
/// intersect the template extent — a mismatch resampling cannot resolve.
pub fn ensure_alignable<T: Copy>(
    layer: &str,
    src: &Raster<T>,
    template: &GridSpec,
) -> Result<(), RecoveryError> {
    let (rows, cols) = src.shape();
    if rows == 0 || cols == 0 {
        return Err(RecoveryError::LayerAlignment {
            layer: layer.to_string(),
            reason: "layer is empty".to_string(),
        });
    }

    let probe: Raster<u8> = Raster::filled(template.rows, template.cols, 0, template.transform, None);
    if !src.overlaps(&probe) {
        return Err(RecoveryError::LayerAlignment {
            layer: layer.to_string(),
            reason: "layer extent does not intersect the template grid".to_string(),
        });
    }
    Ok(())
}

/// Nearest-neighbor resample of a categorical layer onto the template.
/// Cells outside the source extent receive `fill`.
#[must_use]
pub fn resample_nearest<T: Copy>(src: &Raster<T>, template: &GridSpec, fill: T) -> Array2<T> {
    let (src_rows, src_cols) = src.shape();
    let mut out = Array2::from_elem((template.rows, template.cols), fill);

    for row in 0..template.rows {
        for col in 0..template.cols {
            let (x, y) = template.transform.pixel_center(row, col);
            let (fr, fc) = src.transform.world_to_pixel(x, y);
            let (sr, sc) = (fr.floor(), fc.floor());
            if sr >= 0.0 && sc >= 0.0 && (sr as usize) < src_rows && (sc as usize) < src_cols {
                out[[row, col]] = src.data[[sr as usize, sc as usize]];
            }
        }
    }
    out
}

/// Bilinear resample of a continuous layer onto the template. Missing
/// neighbors (NaN or nodata) disable interpolation for that cell and the
/// nearest valid neighbor is used instead; fully missing cells become NaN.
#[must_use]
pub fn resample_bilinear(src: &Raster<f32>, template: &GridSpec) -> Array2<f32> {
    let (src_rows, src_cols) = src.shape();
    let mut out = Array2::from_elem((template.rows, template.cols), f32::NAN);

    let value_at = |r: i64, c: i64| -> Option<f32> {
        if r < 0 || c < 0 || r as usize >= src_rows || c as usize >= src_cols {
            return None;
        }
        let v = src.data[[r as usize, c as usize]];
        if src.is_valid(v) {
            Some(v)
        } else {
            None
        }
    };

    for row in 0..template.rows {
        for col in 0..template.cols {
            let (x, y) = template.transform.pixel_center(row, col);
            let (fr, fc) = src.transform.world_to_pixel(x, y);
            // position relative to source pixel centers
            let (gr, gc) = (fr - 0.5, fc - 0.5);
            let (r0, c0) = (gr.floor() as i64, gc.floor() as i64);
            let (wr, wc) = ((gr - gr.floor()) as f32, (gc - gc.floor()) as f32);

            let corners = [
                (value_at(r0, c0), (1.0 - wr) * (1.0 - wc)),
                (value_at(r0, c0 + 1), (1.0 - wr) * wc),
                (value_at(r0 + 1, c0), wr * (1.0 - wc)),
                (value_at(r0 + 1, c0 + 1), wr * wc),
            ];

            if corners.iter().all(|(v, _)| v.is_some()) {
                out[[row, col]] = corners
                    .iter()
                    .map(|(v, w)| v.unwrap_or(0.0) * w)
                    .sum::<f32>();
            } else {
                // nearest valid fallback for partially missing neighborhoods
                let nearest = value_at(fr.floor() as i64, fc.floor() as i64)
                    .or_else(|| corners.iter().find_map(|(v, _)| *v));
                if let Some(v) = nearest {
                    out[[row, col]] = v;
                }
            }
        }
    }
    out
}
