//! Single-band raster grids with georeferencing
//!
//! A [`Raster`] stores one 2D band as an `ndarray::Array2` in row-major
//! (y, x) order together with its [`GeoTransform`]. All layers for one fire
//! are resampled onto the template grid of the first seasonal raster, so the
//! pipeline only ever compares rasters cell-by-cell after alignment.

use ndarray::Array2;

/// Affine mapping from pixel indices to world coordinates.
///
/// Follows the GDAL convention: `x_world = origin_x + col * pixel_width`,
/// `y_world = origin_y + row * pixel_height`, with `pixel_height` negative
/// for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// World x of the top-left corner of pixel (0, 0)
    pub origin_x: f64,
    /// World y of the top-left corner of pixel (0, 0)
    pub origin_y: f64,
    /// Pixel width in world units (positive)
    pub pixel_width: f64,
    /// Pixel height in world units (negative for north-up)
    pub pixel_height: f64,
}

impl GeoTransform {
    #[must_use]
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// World coordinates of the center of pixel (row, col).
    #[must_use]
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional pixel position of a world coordinate.
    #[must_use]
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (y - self.origin_y) / self.pixel_height,
            (x - self.origin_x) / self.pixel_width,
        )
    }

    /// Whole-pixel offset of `other`'s origin within this grid.
    ///
    /// Used by the merge engine to place a per-fire raster inside the
    /// statewide template. Both grids must share resolution and CRS; the
    /// offset may be negative or exceed the template shape, in which case
    /// out-of-range cells are skipped by the caller.
    #[must_use]
    pub fn offset_of(&self, other: &GeoTransform) -> (i64, i64) {
        let row = (other.origin_y - self.origin_y) / self.pixel_height;
        let col = (other.origin_x - self.origin_x) / self.pixel_width;
        #[allow(clippy::cast_possible_truncation)]
        (row.round() as i64, col.round() as i64)
    }

    /// True when the two grids have (nearly) the same resolution.
    #[must_use]
    pub fn same_resolution(&self, other: &GeoTransform) -> bool {
        (self.pixel_width - other.pixel_width).abs() < 1e-6
            && (self.pixel_height - other.pixel_height).abs() < 1e-6
    }
}

/// One georeferenced band.
#[derive(Debug, Clone)]
pub struct Raster<T> {
    /// Cell values, row-major (y, x)
    pub data: Array2<T>,
    /// Pixel-to-world mapping
    pub transform: GeoTransform,
    /// Declared nodata value, if any
    pub nodata: Option<T>,
}

impl<T: Copy> Raster<T> {
    #[must_use]
    pub fn new(data: Array2<T>, transform: GeoTransform, nodata: Option<T>) -> Self {
        Self {
            data,
            transform,
            nodata,
        }
    }

    /// Create a raster filled with a constant value.
    #[must_use]
    pub fn filled(
        height: usize,
        width: usize,
        value: T,
        transform: GeoTransform,
        nodata: Option<T>,
    ) -> Self {
        Self {
            data: Array2::from_elem((height, width), value),
            transform,
            nodata,
        }
    }

    /// (rows, cols) of the band.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        let s = self.data.shape();
        (s[0], s[1])
    }

    /// World-space bounding box (xmin, ymin, xmax, ymax).
    #[must_use]
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (rows, cols) = self.shape();
        let t = &self.transform;
        let x0 = t.origin_x;
        let x1 = t.origin_x + cols as f64 * t.pixel_width;
        let y0 = t.origin_y;
        let y1 = t.origin_y + rows as f64 * t.pixel_height;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// True when this raster's bounds intersect `other`'s.
    #[must_use]
    pub fn overlaps<U: Copy>(&self, other: &Raster<U>) -> bool {
        let (ax0, ay0, ax1, ay1) = self.bounds();
        let (bx0, by0, bx1, by1) = other.bounds();
        ax0 < bx1 && bx0 < ax1 && ay0 < by1 && by0 < ay1
    }
}

impl Raster<f32> {
    /// True where the value is present (not NaN and not the nodata sentinel).
    #[must_use]
    pub fn is_valid(&self, value: f32) -> bool {
        if value.is_nan() {
            return false;
        }
        match self.nodata {
            Some(nd) => value != nd,
            None => true,
        }
    }
}
