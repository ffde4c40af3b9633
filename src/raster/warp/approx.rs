//! Destination pixel to source pixel mapping, exact or linearly approximated per scanline.

use crate::errors::Result;
use crate::spatial_ref::CoordTransform;
use crate::{GeoTransform, GeoTransformEx};

/// Chains `destination pixel -> destination CRS -> source CRS -> source pixel`.
pub(crate) struct PixelTransformer {
    dst_geo_transform: GeoTransform,
    src_inverse: GeoTransform,
    transform: CoordTransform,
    max_error: f64,
}

impl PixelTransformer {
    /// `transform` maps destination coordinates to source coordinates. With `max_error > 0`
    /// rows are interpolated between exact samples while the error stays below
    /// `max_error` source pixels.
    pub fn new(
        dst_geo_transform: GeoTransform,
        src_geo_transform: GeoTransform,
        transform: CoordTransform,
        max_error: f64,
    ) -> Result<Self> {
        Ok(PixelTransformer {
            dst_geo_transform,
            src_inverse: src_geo_transform.invert()?,
            transform,
            max_error: max_error.max(0.0),
        })
    }

    pub fn is_approximate(&self) -> bool {
        self.max_error > 0.0
    }

    /// Transform destination pixel/line coordinates in place. Failed points become `NaN`.
    pub fn transform_exact(&self, x: &mut [f64], y: &mut [f64]) {
        for (px, py) in x.iter_mut().zip(y.iter_mut()) {
            (*px, *py) = self.dst_geo_transform.apply(*px, *py);
        }
        self.transform.transform_partial(x, y);
        for (px, py) in x.iter_mut().zip(y.iter_mut()) {
            if px.is_finite() && py.is_finite() {
                (*px, *py) = self.src_inverse.apply(*px, *py);
            } else {
                (*px, *py) = (f64::NAN, f64::NAN);
            }
        }
    }

    /// Source coordinates of the pixel centres of destination row `line`, one per element
    /// of `xs`/`ys`, starting at column 0.
    pub fn transform_row(&self, line: usize, xs: &mut [f64], ys: &mut [f64]) {
        let line_y = line as f64 + 0.5;
        if self.is_approximate() {
            self.approximate_span(line_y, 0, xs, ys);
        } else {
            self.exact_span(line_y, 0, xs, ys);
        }
    }

    fn exact_span(&self, line_y: f64, start: usize, xs: &mut [f64], ys: &mut [f64]) {
        for (i, (x, y)) in xs.iter_mut().zip(ys.iter_mut()).enumerate() {
            *x = (start + i) as f64 + 0.5;
            *y = line_y;
        }
        self.transform_exact(xs, ys);
    }

    /// Transform the two ends and the middle of the span exactly. If the middle lies within
    /// `max_error` of the straight line through the ends, interpolate the whole span,
    /// otherwise split it in two at the middle.
    fn approximate_span(&self, line_y: f64, start: usize, xs: &mut [f64], ys: &mut [f64]) {
        let n = xs.len();
        if n < 3 {
            self.exact_span(line_y, start, xs, ys);
            return;
        }
        let mid = n / 2;
        let mut sx = [0.5, mid as f64 + 0.5, (n - 1) as f64 + 0.5].map(|c| c + start as f64);
        let mut sy = [line_y; 3];
        self.transform_exact(&mut sx, &mut sy);
        if sx.iter().chain(sy.iter()).any(|v| !v.is_finite()) {
            self.exact_span(line_y, start, xs, ys);
            return;
        }

        let t = mid as f64 / (n - 1) as f64;
        let error = (sx[0] + t * (sx[2] - sx[0]) - sx[1]).abs()
            + (sy[0] + t * (sy[2] - sy[0]) - sy[1]).abs();
        if error <= self.max_error {
            for (i, (x, y)) in xs.iter_mut().zip(ys.iter_mut()).enumerate() {
                let t = i as f64 / (n - 1) as f64;
                *x = sx[0] + t * (sx[2] - sx[0]);
                *y = sy[0] + t * (sy[2] - sy[0]);
            }
            xs[mid] = sx[1];
            ys[mid] = sy[1];
        } else {
            self.approximate_span(line_y, start, &mut xs[..=mid], &mut ys[..=mid]);
            self.approximate_span(line_y, start + mid, &mut xs[mid..], &mut ys[mid..]);
        }
    }

    /// Size of one destination pixel in source pixels, measured at `(x, y)` in the destination.
    pub fn footprint_at(&self, x: f64, y: f64) -> (f64, f64) {
        let mut xs = [x - 0.5, x + 0.5, x - 0.5];
        let mut ys = [y - 0.5, y - 0.5, y + 0.5];
        self.transform_exact(&mut xs, &mut ys);
        let along_x = (xs[1] - xs[0]).hypot(ys[1] - ys[0]);
        let along_y = (xs[2] - xs[0]).hypot(ys[2] - ys[0]);
        if along_x.is_finite() && along_y.is_finite() {
            (along_x, along_y)
        } else {
            (1.0, 1.0)
        }
    }
}
