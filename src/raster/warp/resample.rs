use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{RasterError, Result};

/// Warp Resampling Algorithm
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum WarpResampleAlg {
    /// Nearest neighbour (select on one input pixel)
    #[default]
    NearestNeighbour,
    /// Bilinear (2x2 kernel)
    Bilinear,
    /// Cubic Convolution Approximation (4x4 kernel)
    Cubic,
    /// Cubic B-Spline Approximation (4x4 kernel)
    CubicSpline,
    /// Lanczos windowed sinc interpolation (6x6 kernel)
    Lanczos,
    /// Average (computes the weighted average of all non-NODATA contributing pixels)
    Average,
    /// Mode (selects the value which appears most often of all the sampled points)
    Mode,
    /// Max (selects maximum of all non-NODATA contributing pixels)
    Max,
    /// Min (selects minimum of all non-NODATA contributing pixels)
    Min,
    /// Med (selects median of all non-NODATA contributing pixels)
    Med,
    /// Q1 (selects first quartile of all non-NODATA contributing pixels)
    Q1,
    /// Q3 (selects third quartile of all non-NODATA contributing pixels)
    Q3,
    /// Sum (weighed sum of all non-NODATA contributing pixels)
    Sum,
    /// RMS (weighted root mean square (quadratic mean) of all non-NODATA contributing pixels)
    RMS,
}

impl WarpResampleAlg {
    pub const ALL: [WarpResampleAlg; 14] = [
        WarpResampleAlg::NearestNeighbour,
        WarpResampleAlg::Bilinear,
        WarpResampleAlg::Cubic,
        WarpResampleAlg::CubicSpline,
        WarpResampleAlg::Lanczos,
        WarpResampleAlg::Average,
        WarpResampleAlg::Mode,
        WarpResampleAlg::Max,
        WarpResampleAlg::Min,
        WarpResampleAlg::Med,
        WarpResampleAlg::Q1,
        WarpResampleAlg::Q3,
        WarpResampleAlg::Sum,
        WarpResampleAlg::RMS,
    ];

    /// The name `gdalwarp -r` accepts for this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            WarpResampleAlg::NearestNeighbour => "near",
            WarpResampleAlg::Bilinear => "bilinear",
            WarpResampleAlg::Cubic => "cubic",
            WarpResampleAlg::CubicSpline => "cubicspline",
            WarpResampleAlg::Lanczos => "lanczos",
            WarpResampleAlg::Average => "average",
            WarpResampleAlg::Mode => "mode",
            WarpResampleAlg::Max => "max",
            WarpResampleAlg::Min => "min",
            WarpResampleAlg::Med => "med",
            WarpResampleAlg::Q1 => "q1",
            WarpResampleAlg::Q3 => "q3",
            WarpResampleAlg::Sum => "sum",
            WarpResampleAlg::RMS => "rms",
        }
    }

    /// Half width of the kernel footprint in source pixels, for interpolating kernels.
    pub(crate) fn radius(&self) -> usize {
        match self {
            WarpResampleAlg::NearestNeighbour => 0,
            WarpResampleAlg::Bilinear => 1,
            WarpResampleAlg::Cubic | WarpResampleAlg::CubicSpline => 2,
            WarpResampleAlg::Lanczos => 3,
            _ => 1,
        }
    }

    /// `true` for kernels that aggregate every source pixel under the destination pixel.
    pub(crate) fn is_area_based(&self) -> bool {
        !matches!(
            self,
            WarpResampleAlg::NearestNeighbour
                | WarpResampleAlg::Bilinear
                | WarpResampleAlg::Cubic
                | WarpResampleAlg::CubicSpline
                | WarpResampleAlg::Lanczos
        )
    }
}

impl Display for WarpResampleAlg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WarpResampleAlg {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.to_ascii_lowercase();
        if s == "nearest" || s == "nearestneighbour" {
            return Ok(WarpResampleAlg::NearestNeighbour);
        }
        WarpResampleAlg::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| {
                RasterError::BadArgument(format!("'{s}' does not name a supported WarpResampleAlg"))
            })
    }
}

/// Source pixels of one band available to the kernels.
///
/// `data` covers `width x height` pixels starting at `origin`. Lookups outside the
/// source raster, or hitting nodata or `NaN`, yield `None`.
pub(crate) struct SourceWindow<'a> {
    pub origin: (usize, usize),
    pub width: usize,
    pub height: usize,
    pub data: &'a [f64],
    pub nodata: Option<f64>,
}

impl SourceWindow<'_> {
    fn get(&self, x: isize, y: isize) -> Option<f64> {
        let wx = x - self.origin.0 as isize;
        let wy = y - self.origin.1 as isize;
        if wx < 0 || wy < 0 || wx as usize >= self.width || wy as usize >= self.height {
            return None;
        }
        let v = self.data[wy as usize * self.width + wx as usize];
        if v.is_nan() || self.nodata == Some(v) {
            return None;
        }
        Some(v)
    }
}

/// Resample `window` at source pixel/line `(x, y)`.
///
/// `footprint` is the size, in source pixels, of one destination pixel and is only used
/// by the area based kernels. Returns `None` when no valid source pixel contributes.
pub(crate) fn resample(
    alg: WarpResampleAlg,
    window: &SourceWindow<'_>,
    x: f64,
    y: f64,
    footprint: (f64, f64),
) -> Option<f64> {
    match alg {
        WarpResampleAlg::NearestNeighbour => window.get(x.floor() as isize, y.floor() as isize),
        WarpResampleAlg::Bilinear => convolve(window, x, y, 1, bilinear_weight),
        WarpResampleAlg::Cubic => convolve(window, x, y, 2, cubic_weight),
        WarpResampleAlg::CubicSpline => convolve(window, x, y, 2, cubic_spline_weight),
        WarpResampleAlg::Lanczos => convolve(window, x, y, 3, lanczos_weight),
        _ => aggregate(alg, window, x, y, footprint),
    }
}

fn bilinear_weight(d: f64) -> f64 {
    (1.0 - d.abs()).max(0.0)
}

/// Keys cubic convolution, `a = -0.5`.
fn cubic_weight(d: f64) -> f64 {
    let d = d.abs();
    if d <= 1.0 {
        (1.5 * d - 2.5) * d * d + 1.0
    } else if d < 2.0 {
        ((-0.5 * d + 2.5) * d - 4.0) * d + 2.0
    } else {
        0.0
    }
}

fn cubic_spline_weight(d: f64) -> f64 {
    let d = d.abs();
    if d <= 1.0 {
        (0.5 * d - 1.0) * d * d + 2.0 / 3.0
    } else if d < 2.0 {
        let t = 2.0 - d;
        t * t * t / 6.0
    } else {
        0.0
    }
}

fn lanczos_weight(d: f64) -> f64 {
    const A: f64 = 3.0;
    if d == 0.0 {
        return 1.0;
    }
    if d.abs() >= A {
        return 0.0;
    }
    let pd = std::f64::consts::PI * d;
    A * pd.sin() * (pd / A).sin() / (pd * pd)
}

/// Separable convolution around the pixel centres nearest `(x, y)`, renormalized over
/// the valid taps.
fn convolve(
    window: &SourceWindow<'_>,
    x: f64,
    y: f64,
    radius: isize,
    weight: fn(f64) -> f64,
) -> Option<f64> {
    // kernels are evaluated against pixel centres
    let (fx, fy) = (x - 0.5, y - 0.5);
    let (ix, iy) = (fx.floor() as isize, fy.floor() as isize);

    let mut sum = 0.0;
    let mut weights = 0.0;
    for ty in (iy - radius + 1)..=(iy + radius) {
        let wy = weight(fy - ty as f64);
        if wy == 0.0 {
            continue;
        }
        for tx in (ix - radius + 1)..=(ix + radius) {
            let wx = weight(fx - tx as f64);
            if wx == 0.0 {
                continue;
            }
            if let Some(v) = window.get(tx, ty) {
                sum += wx * wy * v;
                weights += wx * wy;
            }
        }
    }
    if weights.abs() < 1e-10 {
        None
    } else {
        Some(sum / weights)
    }
}

/// Area kernels over the footprint `[x - fw/2, x + fw/2) x [y - fh/2, y + fh/2)`.
fn aggregate(
    alg: WarpResampleAlg,
    window: &SourceWindow<'_>,
    x: f64,
    y: f64,
    footprint: (f64, f64),
) -> Option<f64> {
    let hx = footprint.0.max(1.0) / 2.0;
    let hy = footprint.1.max(1.0) / 2.0;
    let (x0, x1) = (x - hx, x + hx);
    let (y0, y1) = (y - hy, y + hy);

    let mut samples: Vec<(f64, f64)> = Vec::new();
    for ty in (y0.floor() as isize)..(y1.ceil() as isize) {
        let oy = (y1.min(ty as f64 + 1.0) - y0.max(ty as f64)).max(0.0);
        if oy <= 0.0 {
            continue;
        }
        for tx in (x0.floor() as isize)..(x1.ceil() as isize) {
            let ox = (x1.min(tx as f64 + 1.0) - x0.max(tx as f64)).max(0.0);
            if ox <= 0.0 {
                continue;
            }
            if let Some(v) = window.get(tx, ty) {
                samples.push((v, ox * oy));
            }
        }
    }
    if samples.is_empty() {
        return None;
    }

    let weights: f64 = samples.iter().map(|(_, w)| w).sum();
    Some(match alg {
        WarpResampleAlg::Average => samples.iter().map(|(v, w)| v * w).sum::<f64>() / weights,
        WarpResampleAlg::Sum => samples.iter().map(|(v, w)| v * w).sum(),
        WarpResampleAlg::RMS => {
            (samples.iter().map(|(v, w)| v * v * w).sum::<f64>() / weights).sqrt()
        }
        WarpResampleAlg::Max => samples.iter().map(|(v, _)| *v).fold(f64::MIN, f64::max),
        WarpResampleAlg::Min => samples.iter().map(|(v, _)| *v).fold(f64::MAX, f64::min),
        WarpResampleAlg::Mode => mode(&samples),
        WarpResampleAlg::Med => quantile(&samples, 0.5),
        WarpResampleAlg::Q1 => quantile(&samples, 0.25),
        WarpResampleAlg::Q3 => quantile(&samples, 0.75),
        _ => return None,
    })
}

/// Most frequent value, the first one seen on ties.
fn mode(samples: &[(f64, f64)]) -> f64 {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for (v, _) in samples {
        match counts.iter().position(|(c, _)| c == v) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((*v, 1)),
        }
    }
    let mut best = counts[0];
    for c in &counts[1..] {
        if c.1 > best.1 {
            best = *c;
        }
    }
    best.0
}

fn quantile(samples: &[(f64, f64)], q: f64) -> f64 {
    let mut values: Vec<f64> = samples.iter().map(|(v, _)| *v).collect();
    values.sort_by(f64::total_cmp);
    let idx = ((q * values.len() as f64).ceil() as usize).clamp(1, values.len()) - 1;
    values[idx]
}
