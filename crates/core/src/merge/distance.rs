//! Burn-boundary distance
//!
//! Exact Euclidean distance transform (Felzenszwalb & Huttenlocher's
//! lower-envelope-of-parabolas algorithm) from the burn-severity footprint,
//! converted to whole hundreds of meters with ceiling rounding and capped
//! at 127 so the result fits the mosaic's int8 bands.

use ndarray::Array2;

use crate::core_types::raster::GeoTransform;

const INF: f64 = 1e20;

/// One-dimensional squared distance transform of `f` into `d`.
fn dt_1d(f: &[f64], d: &mut [f64]) {
    let n = f.len();
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    z[0] = -INF;
    z[1] = INF;

    let intersect = |q: usize, p: usize| -> f64 {
        let (qf, pf) = (q as f64, p as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    for q in 1..n {
        let mut s = intersect(q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = INF;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dq = q as f64 - v[k] as f64;
        *out = dq * dq + f[v[k]];
    }
}

/// Squared pixel distance from every cell to the nearest `true` cell.
/// Cells stay at `INF` when the mask is entirely empty.
fn squared_distance(mask: &Array2<bool>) -> Array2<f64> {
    let (rows, cols) = (mask.shape()[0], mask.shape()[1]);
    let mut d = Array2::from_elem((rows, cols), INF);
    for ((r, c), &m) in mask.indexed_iter() {
        if m {
            d[[r, c]] = 0.0;
        }
    }

    // columns pass, then rows pass
    let mut line = vec![0.0f64; rows.max(cols)];
    let mut out = vec![0.0f64; rows.max(cols)];
    for c in 0..cols {
        for r in 0..rows {
            line[r] = d[[r, c]];
        }
        dt_1d(&line[..rows], &mut out[..rows]);
        for r in 0..rows {
            d[[r, c]] = out[r];
        }
    }
    for r in 0..rows {
        for c in 0..cols {
            line[c] = d[[r, c]];
        }
        dt_1d(&line[..cols], &mut out[..cols]);
        for c in 0..cols {
            d[[r, c]] = out[c];
        }
    }
    d
}

/// Distance from the burn footprint (severity classes 2-4), in hundreds of
/// meters, ceiling-rounded and clamped at 127. Burned pixels are 0; when
/// the fire has no burned pixel at all, every cell saturates at 127.
#[must_use]
pub fn boundary_distance(severity: &Array2<i8>, transform: &GeoTransform) -> Array2<i8> {
    let burned = severity.mapv(|v| (2..=4).contains(&v));
    let d2 = squared_distance(&burned);
    let pixel = transform.pixel_width.abs();
    d2.mapv(|sq| {
        if sq >= INF {
            return 127;
        }
        let meters = sq.sqrt() * pixel;
        let hundreds = (meters / 100.0).ceil();
        if hundreds >= 127.0 {
            127
        } else {
            hundreds as i8
        }
    })
}
