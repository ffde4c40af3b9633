use std::fmt::{Display, Formatter};
use std::str::FromStr;

use geo_types::Geometry;

use crate::config;
use crate::cpl::CslStringList;
use crate::errors::{RasterError, Result};
use crate::raster::warp::resample::WarpResampleAlg;

/// Memory limit used when neither the options nor `WARP_MEMORY_LIMIT` set one.
pub const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Smallest accepted memory limit, in bytes.
pub const MIN_MEMORY_LIMIT: usize = 100_000;

/// Container for options provided to the warp engine.
///
/// Every setting has a typed accessor. The free-form [`extra_options`](Self::extra_options)
/// are consulted for `INIT_DEST`, `NUM_THREADS`, `CUTLINE_BLEND_DIST` and `DST_ALPHA_MAX`
/// when the typed setting is left unset.
#[derive(Debug, Clone, Default)]
pub struct WarpOptions {
    resampling_alg: WarpResampleAlg,
    memory_limit: usize,
    src_bands: Option<Vec<usize>>,
    dst_bands: Option<Vec<usize>>,
    dst_alpha_band: Option<usize>,
    cutline: Option<Geometry<f64>>,
    blend_distance: Option<f64>,
    initial_value: Option<InitValue>,
    multi: bool,
    num_threads: Option<NumThreads>,
    extra_options: CslStringList,
}

impl WarpOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Specify the resampling algorithm to use in Warp operation.
    pub fn with_resampling_alg(&mut self, alg: WarpResampleAlg) -> &mut Self {
        self.resampling_alg = alg;
        self
    }

    /// Get the resampling algorithm to be used in Warp operation.
    pub fn resampling_alg(&self) -> WarpResampleAlg {
        self.resampling_alg
    }

    /// Memory limit in bytes for the source and destination buffers of one pass.
    ///
    /// Use `0` to specify the default, `WARP_MEMORY_LIMIT` or 64MB.
    pub fn with_memory_limit(&mut self, limit_bytes: usize) -> &mut Self {
        self.memory_limit = limit_bytes;
        self
    }

    /// Fetch the memory limit setting in bytes.
    ///
    /// Zero means use the default.
    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    /// 1-based source bands to read. Must be paired with [`with_dst_bands`](Self::with_dst_bands).
    pub fn with_src_bands(&mut self, bands: &[usize]) -> &mut Self {
        self.src_bands = Some(bands.to_vec());
        self
    }

    pub fn src_bands(&self) -> Option<&[usize]> {
        self.src_bands.as_deref()
    }

    /// 1-based destination bands receiving the source bands at the same position.
    pub fn with_dst_bands(&mut self, bands: &[usize]) -> &mut Self {
        self.dst_bands = Some(bands.to_vec());
        self
    }

    pub fn dst_bands(&self) -> Option<&[usize]> {
        self.dst_bands.as_deref()
    }

    /// Destination band receiving the coverage of every written pixel, scaled to
    /// `DST_ALPHA_MAX` (255 by default).
    pub fn with_dst_alpha_band(&mut self, band: usize) -> &mut Self {
        self.dst_alpha_band = Some(band);
        self
    }

    pub fn dst_alpha_band(&self) -> Option<usize> {
        self.dst_alpha_band
    }

    /// Clip the output to a polygon given in source pixel/line coordinates.
    ///
    /// Only `Polygon` and `MultiPolygon` are accepted; anything else fails the warp with
    /// [`RasterError::InvalidCutlineType`].
    pub fn with_cutline(&mut self, cutline: Geometry<f64>) -> &mut Self {
        self.cutline = Some(cutline);
        self
    }

    pub fn cutline(&self) -> Option<&Geometry<f64>> {
        self.cutline.as_ref()
    }

    /// Distance in source pixels over which the cutline edge is blended. `0` cuts hard.
    pub fn with_blend_distance(&mut self, distance: f64) -> &mut Self {
        self.blend_distance = Some(distance);
        self
    }

    /// Blend distance: the typed setting, else `CUTLINE_BLEND_DIST`, else `0`.
    pub fn blend_distance(&self) -> f64 {
        self.blend_distance
            .or_else(|| self.parsed_extra("CUTLINE_BLEND_DIST"))
            .unwrap_or(0.0)
    }

    /// Forces the destination image to be initialized to the indicated value (for all bands),
    /// or indicates that it should be initialized to the band's no-data value.
    ///
    /// If this value isn't set the destination image will be read and overlaid.
    pub fn with_initial_value(&mut self, init: InitValue) -> &mut Self {
        self.initial_value = Some(init);
        self
    }

    /// Fetch the initial value setting, if any, falling back to `INIT_DEST`.
    ///
    /// See [`with_initial_value`][Self::with_initial_value] for details.
    pub fn initial_value(&self) -> Option<InitValue> {
        self.initial_value
            .or_else(|| self.parsed_extra::<InitValue>("INIT_DEST"))
    }

    /// Process destination tiles on several threads.
    pub fn with_multi(&mut self, multi: bool) -> &mut Self {
        self.multi = multi;
        self
    }

    pub fn multi(&self) -> bool {
        self.multi
    }

    /// Worker count for [`multi`](Self::multi) mode.
    pub fn with_num_threads(&mut self, num_threads: NumThreads) -> &mut Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Worker count: the typed setting, else `NUM_THREADS`, else the `GDAL_NUM_THREADS`
    /// configuration option, else all CPUs.
    pub fn num_threads(&self) -> NumThreads {
        self.num_threads
            .or_else(|| self.parsed_extra("NUM_THREADS"))
            .or_else(|| {
                let value = config::get_config_option("GDAL_NUM_THREADS", "").ok()?;
                if value.is_empty() {
                    return None;
                }
                parse_logged("GDAL_NUM_THREADS", &value)
            })
            .unwrap_or(NumThreads::AllCpus)
    }

    /// Value written to the alpha band for full coverage.
    pub fn dst_alpha_max(&self) -> f64 {
        self.parsed_extra("DST_ALPHA_MAX").unwrap_or(255.0)
    }

    /// Get any extra options attached to the Warp options.
    pub fn extra_options(&self) -> &CslStringList {
        &self.extra_options
    }

    /// Get a mutable reference to extra options attached to the Warp options.
    pub fn extra_options_mut(&mut self) -> &mut CslStringList {
        &mut self.extra_options
    }

    fn parsed_extra<T: FromStr>(&self, key: &str) -> Option<T> {
        let value = self.extra_options.fetch_name_value(key)?;
        parse_logged(key, &value)
    }

    /// Check everything that does not depend on the datasets.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.src_bands.is_some() != self.dst_bands.is_some() {
            let (set, missing) = if self.src_bands.is_some() {
                ("srcBands", "dstBands")
            } else {
                ("dstBands", "srcBands")
            };
            return Err(RasterError::PairedOptionMissing(format!(
                "{missing} must be provided if {set} option is used"
            )));
        }
        if let (Some(src), Some(dst)) = (&self.src_bands, &self.dst_bands) {
            if src.len() != dst.len() {
                return Err(RasterError::PairedOptionMissing(format!(
                    "Number of srcBands ({}) must match number of dstBands ({})",
                    src.len(),
                    dst.len()
                )));
            }
        }
        if let Some(cutline) = &self.cutline {
            if !matches!(cutline, Geometry::Polygon(_) | Geometry::MultiPolygon(_)) {
                return Err(RasterError::InvalidCutlineType(
                    geometry_type_name(cutline).to_string(),
                ));
            }
        }
        if self.memory_limit != 0 && self.memory_limit < MIN_MEMORY_LIMIT {
            return Err(RasterError::MemoryLimitTooSmall {
                limit: self.memory_limit,
                minimum: MIN_MEMORY_LIMIT,
            });
        }
        Ok(())
    }

    /// Memory limit to plan with: the option, else `WARP_MEMORY_LIMIT`, else the default.
    pub(crate) fn effective_memory_limit(&self) -> usize {
        if self.memory_limit != 0 {
            return self.memory_limit;
        }
        config::get_config_option("WARP_MEMORY_LIMIT", "")
            .ok()
            .filter(|v| !v.is_empty())
            .and_then(|v| parse_logged::<usize>("WARP_MEMORY_LIMIT", &v))
            .map(|v| v.max(MIN_MEMORY_LIMIT))
            .unwrap_or(DEFAULT_MEMORY_LIMIT)
    }
}

fn parse_logged<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring unparsable {key}={value}");
            None
        }
    }
}

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Specifies the initial value cells in the destination dataset during a warp operation.
///
/// See [`WarpOptions::with_initial_value`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitValue {
    NoData,
    Value(f64),
}

impl From<f64> for InitValue {
    fn from(v: f64) -> Self {
        InitValue::Value(v)
    }
}

impl Display for InitValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            InitValue::NoData => "NO_DATA".to_string(),
            InitValue::Value(v) => v.to_string(),
        };
        write!(f, "{}", str)
    }
}

impl FromStr for InitValue {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("NO_DATA") {
            return Ok(InitValue::NoData);
        }
        s.parse::<f64>()
            .map(InitValue::Value)
            .map_err(|_| RasterError::BadArgument(format!("Invalid INIT_DEST value '{s}'")))
    }
}

/// Worker count of a multi-threaded warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumThreads {
    #[default]
    AllCpus,
    Count(usize),
}

impl Display for NumThreads {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NumThreads::AllCpus => f.write_str("ALL_CPUS"),
            NumThreads::Count(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for NumThreads {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("ALL_CPUS") {
            return Ok(NumThreads::AllCpus);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(NumThreads::Count(n)),
            _ => Err(RasterError::BadArgument(format!(
                "NUM_THREADS must be ALL_CPUS or a positive count, got '{s}'"
            ))),
        }
    }
}
