use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::errors::*;
use crate::raster::warp::approx::PixelTransformer;
use crate::raster::warp::cutline::Cutline;
use crate::raster::warp::resample::{resample, SourceWindow};
use crate::raster::warp::{InitValue, NumThreads, ReprojectOptions, WarpResampleAlg};
use crate::raster::{RasterBand, RasterIOExtraArg};
use crate::spatial_ref::CoordTransform;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Source pixels read for one tile, `width x height` starting at `origin`, one plane per band.
struct SourceBlock {
    origin: (usize, usize),
    width: usize,
    height: usize,
    planes: Vec<Vec<f64>>,
}

/// Everything needed to warp, resolved and validated before any pixel is touched.
struct WarpPlan {
    src_bands: Vec<RasterBand>,
    src_nodata: Vec<Option<f64>>,
    src_size: (usize, usize),
    dst_bands: Vec<RasterBand>,
    dst_alpha: Option<RasterBand>,
    dst_size: (usize, usize),
    transformer: PixelTransformer,
    cutline: Option<Cutline>,
    alg: WarpResampleAlg,
    alpha_max: f64,
    memory_limit: usize,
}

fn check_band(what: &'static str, index: usize, count: usize) -> Result<()> {
    if index == 0 || index > count {
        return Err(RasterError::BandOutOfRange { what, index, count });
    }
    Ok(())
}

fn check_raster(what: &'static str, ds: &Dataset) -> Result<()> {
    if !ds.is_open() {
        return Err(RasterError::ClosedResource { what: "Dataset" });
    }
    if !ds.is_raster() || ds.raster_count() == 0 {
        return Err(RasterError::NotARaster {
            what,
            msg: "dataset has no raster bands".to_string(),
        });
    }
    Ok(())
}

fn geo_transform(what: &'static str, ds: &Dataset) -> Result<crate::GeoTransform> {
    ds.geo_transform().map_err(|e| match e {
        RasterError::NotARaster { msg, .. } => RasterError::NotARaster { what, msg },
        other => other,
    })
}

impl WarpPlan {
    fn new(src: &Dataset, dst: &Dataset, options: &ReprojectOptions) -> Result<Self> {
        check_raster("Source", src)?;
        check_raster("Destination", dst)?;
        if dst.read_only() {
            return Err(RasterError::ReadOnly);
        }
        let src_gt = geo_transform("Source", src)?;
        let dst_gt = geo_transform("Destination", dst)?;

        let warp = options.warp_options();
        warp.validate()?;

        let (src_indices, dst_indices) = match (warp.src_bands(), warp.dst_bands()) {
            (Some(s), Some(d)) => (s.to_vec(), d.to_vec()),
            _ => {
                let all: Vec<usize> = (1..=src.raster_count()).collect();
                (all.clone(), all)
            }
        };
        for &i in &src_indices {
            check_band("Source", i, src.raster_count())?;
        }
        for &i in &dst_indices {
            check_band("Destination", i, dst.raster_count())?;
        }
        if let Some(alpha) = warp.dst_alpha_band() {
            check_band("Alpha", alpha, dst.raster_count())?;
        }

        let cutline = warp
            .cutline()
            .map(|g| Cutline::new(g, warp.blend_distance()))
            .transpose()?;

        let s_srs = match options.src_spatial_ref() {
            Some(srs) => Some(srs.clone()),
            None => src.spatial_ref()?,
        };
        let t_srs = match options.dst_spatial_ref() {
            Some(srs) => Some(srs.clone()),
            None => dst.spatial_ref()?,
        };
        let transform = match (&s_srs, &t_srs) {
            (Some(s), Some(t)) => options.transform_provider().create_transform(t, s)?,
            _ => {
                log::debug!("Spatial reference missing, warping through geotransforms only");
                CoordTransform::from_geo_transform(
                    "destination",
                    "source",
                    [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
                )
            }
        };
        let transformer = PixelTransformer::new(
            dst_gt,
            src_gt,
            transform,
            options.max_error().unwrap_or(0.0),
        )?;

        let src_bands = src_indices
            .iter()
            .map(|&i| src.rasterband(i))
            .collect::<Result<Vec<_>>>()?;
        let src_nodata = src_bands
            .iter()
            .map(|b| Ok(options.src_nodata().or(b.no_data_value()?)))
            .collect::<Result<Vec<_>>>()?;
        let dst_bands = dst_indices
            .iter()
            .map(|&i| dst.rasterband(i))
            .collect::<Result<Vec<_>>>()?;
        let dst_alpha = warp
            .dst_alpha_band()
            .map(|i| dst.rasterband(i))
            .transpose()?;

        Ok(WarpPlan {
            src_bands,
            src_nodata,
            src_size: src.raster_size(),
            dst_bands,
            dst_alpha,
            dst_size: dst.raster_size(),
            transformer,
            cutline,
            alg: warp.resampling_alg(),
            alpha_max: warp.dst_alpha_max(),
            memory_limit: warp.effective_memory_limit(),
        })
    }

    /// Values per destination pixel in the interleaved work buffer: one per band plus alpha.
    fn stride(&self) -> usize {
        self.dst_bands.len() + usize::from(self.dst_alpha.is_some())
    }

    fn output_bands(&self) -> impl Iterator<Item = &RasterBand> {
        self.dst_bands.iter().chain(self.dst_alpha.iter())
    }

    /// Strides of one band inside the interleaved work buffer.
    fn interleaved(&self) -> RasterIOExtraArg {
        let mut args = RasterIOExtraArg::new();
        args.with_pixel_space(self.stride() * F64_BYTES)
            .with_line_space(self.dst_size.0 * self.stride() * F64_BYTES);
        args
    }

    fn initialize(&self, init: InitValue, dst_nodata: Option<f64>) -> Result<()> {
        for band in self.output_bands() {
            let value = match init {
                InitValue::Value(v) => v,
                InitValue::NoData => match dst_nodata {
                    Some(v) => v,
                    None => band.no_data_value()?.unwrap_or(0.0),
                },
            };
            band.clone().fill(value)?;
        }
        Ok(())
    }

    /// Half of the memory limit holds destination rows and their source coordinates, the
    /// other half is shared by the source windows of the tiles running at the same time.
    fn run(&self, pool: Option<&rayon::ThreadPool>) -> Result<()> {
        let (width, height) = self.dst_size;
        let stride = self.stride();
        // interleaved values, source x/y and footprint width/height per pixel
        let row_bytes = width * (stride + 4) * F64_BYTES;
        let chunk_rows = ((self.memory_limit / 2) / row_bytes).clamp(1, height);
        let workers = pool.map_or(1, |pool| pool.current_num_threads().max(1));
        let tile_budget = (self.memory_limit / 2) / workers;
        log::debug!(
            "Warping {:?} -> {:?}, {} band(s), {} kernel, {} rows per chunk, {} bytes of source per tile, approximate: {}",
            self.src_size,
            self.dst_size,
            self.src_bands.len(),
            self.alg,
            chunk_rows,
            tile_budget,
            self.transformer.is_approximate()
        );

        let args = self.interleaved();
        let mut first = 0;
        while first < height {
            let rows = chunk_rows.min(height - first);
            let window = (0, first as isize);
            let mut buf = vec![0.0f64; rows * width * stride];

            for (k, band) in self.output_bands().enumerate() {
                band.read_into_slice(window, (width, rows), (width, rows), &mut buf[k..], Some(&args))?;
            }

            let tile_rows = match pool {
                Some(_) => rows.div_ceil(workers * 4).max(1),
                None => rows,
            };
            let tile_len = tile_rows * width * stride;
            let tile = |(t, rows_buf): (usize, &mut [f64])| {
                self.warp_tile((0, first + t * tile_rows), width, tile_budget, rows_buf)
            };
            match pool {
                Some(pool) => pool.install(|| {
                    buf.par_chunks_mut(tile_len)
                        .enumerate()
                        .try_for_each(tile)
                })?,
                None => buf.chunks_mut(tile_len).enumerate().try_for_each(tile)?,
            }

            for (k, band) in self.output_bands().enumerate() {
                band.clone()
                    .write_from_slice(window, (width, rows), (width, rows), &buf[k..], Some(&args))?;
            }
            first += rows;
        }
        Ok(())
    }

    /// Warp the destination block at `origin` (column, row), `cols` pixels wide, into `buf`.
    /// `buf` holds the interleaved values of the block already initialized with the current
    /// destination content. Blocks whose source window needs more than `budget` bytes are
    /// split by rows, single rows by columns.
    fn warp_tile(
        &self,
        origin: (usize, usize),
        cols: usize,
        budget: usize,
        buf: &mut [f64],
    ) -> Result<()> {
        let width = self.dst_size.0;
        let stride = self.stride();
        let rows = buf.len() / (cols * stride);
        let (first_col, first_row) = origin;

        // whole rows are transformed so approximation does not depend on the tiling
        let mut row_x = vec![0.0; width];
        let mut row_y = vec![0.0; width];
        let mut xs = Vec::with_capacity(rows * cols);
        let mut ys = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            self.transformer.transform_row(first_row + r, &mut row_x, &mut row_y);
            xs.extend_from_slice(&row_x[first_col..first_col + cols]);
            ys.extend_from_slice(&row_y[first_col..first_col + cols]);
        }
        let footprints: Vec<(f64, f64)> = if self.alg.is_area_based() {
            (0..rows * cols)
                .map(|i| {
                    self.transformer.footprint_at(
                        (first_col + i % cols) as f64 + 0.5,
                        (first_row + i / cols) as f64 + 0.5,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        let Some((src_origin, size)) = self.source_window(&xs, &ys, &footprints) else {
            log::trace!("Block {origin:?} of {cols}x{rows} does not overlap the source");
            return Ok(());
        };
        let bytes = size.0 * size.1 * self.src_bands.len() * F64_BYTES;
        if bytes > budget && rows > 1 {
            let half = rows / 2;
            let (top, bottom) = buf.split_at_mut(half * cols * stride);
            self.warp_tile(origin, cols, budget, top)?;
            return self.warp_tile((first_col, first_row + half), cols, budget, bottom);
        }
        if bytes > budget && cols > 1 {
            let half = cols / 2;
            let (left, right) = buf.split_at_mut(half * stride);
            self.warp_tile(origin, half, budget, left)?;
            return self.warp_tile((first_col + half, first_row), cols - half, budget, right);
        }
        log::trace!("Block {origin:?} of {cols}x{rows} reads source window {src_origin:?} {size:?}");

        let planes = self
            .src_bands
            .iter()
            .map(|band| {
                band.read_as::<f64>(
                    (src_origin.0 as isize, src_origin.1 as isize),
                    size,
                    size,
                    None,
                )
                .map(|b| b.data)
            })
            .collect::<Result<Vec<_>>>()?;
        let block = SourceBlock {
            origin: src_origin,
            width: size.0,
            height: size.1,
            planes,
        };

        for (i, px) in buf.chunks_mut(stride).enumerate() {
            let footprint = footprints.get(i).copied().unwrap_or((1.0, 1.0));
            self.warp_pixel(xs[i], ys[i], footprint, &block, px);
        }
        Ok(())
    }

    fn inside_source(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.src_size.0 as f64 && y < self.src_size.1 as f64
    }

    /// Source pixels needed to resample every point of the tile, clipped to the source raster.
    ///
    /// Interpolating kernels need their radius around each point, area kernels half of the
    /// largest footprint of the tile along each axis.
    fn source_window(
        &self,
        xs: &[f64],
        ys: &[f64],
        footprints: &[(f64, f64)],
    ) -> Option<((usize, usize), (usize, usize))> {
        let mut min = (f64::INFINITY, f64::INFINITY);
        let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut reach = (1.0f64, 1.0f64);
        for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
            if !self.inside_source(x, y) {
                continue;
            }
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
            if let Some(&(fw, fh)) = footprints.get(i) {
                reach = (reach.0.max(fw), reach.1.max(fh));
            }
        }
        if min.0 > max.0 {
            return None;
        }
        let (margin_x, margin_y) = if self.alg.is_area_based() {
            (
                (reach.0 / 2.0).ceil() as usize + 1,
                (reach.1 / 2.0).ceil() as usize + 1,
            )
        } else {
            (self.alg.radius(), self.alg.radius())
        };
        let x0 = (min.0.floor() as usize).saturating_sub(margin_x);
        let y0 = (min.1.floor() as usize).saturating_sub(margin_y);
        let x1 = (max.0.floor() as usize + margin_x + 1).min(self.src_size.0);
        let y1 = (max.1.floor() as usize + margin_y + 1).min(self.src_size.1);
        Some(((x0, y0), (x1 - x0, y1 - y0)))
    }

    fn warp_pixel(
        &self,
        x: f64,
        y: f64,
        footprint: (f64, f64),
        block: &SourceBlock,
        px: &mut [f64],
    ) {
        if !self.inside_source(x, y) {
            return;
        }
        let coverage = match &self.cutline {
            Some(cutline) => cutline.coverage(x, y),
            None => 1.0,
        };
        if coverage <= 0.0 {
            return;
        }

        let mut written = false;
        for (k, plane) in block.planes.iter().enumerate() {
            let window = SourceWindow {
                origin: block.origin,
                width: block.width,
                height: block.height,
                data: plane,
                nodata: self.src_nodata[k],
            };
            if let Some(v) = resample(self.alg, &window, x, y, footprint) {
                px[k] = if coverage < 1.0 {
                    px[k] * (1.0 - coverage) + v * coverage
                } else {
                    v
                };
                written = true;
            }
        }
        if written && self.dst_alpha.is_some() {
            let a = self.dst_bands.len();
            px[a] = px[a] * (1.0 - coverage) + self.alpha_max * coverage;
        }
    }
}

fn build_pool(num_threads: NumThreads) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let NumThreads::Count(n) = num_threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| RasterError::UnexpectedLogicError(format!("Failed to create threadpool: {e}")))
}

/// Reproject one dataset into another dataset.
///
/// Assumes destination dataset is properly sized and setup with a
/// [`GeoTransform`][crate::GeoTransform] and [`RasterBand`]s. Each destination pixel centre
/// is mapped into the source, clipped by the cutline, resampled and written to the mapped
/// destination bands. Pixels mapping outside the source keep their current value.
///
/// Every option is checked before any pixel is read or written. Errors raised while
/// warping leave the rows already written in place.
///
/// # Example
///
/// ```rust
/// # fn main() -> georaster::errors::Result<()> {
/// use georaster::raster::warp::{reproject_image, ReprojectOptions};
/// use georaster::Dataset;
///
/// let src = Dataset::create_with_band_type::<u8>(4, 4, 1)?;
/// src.set_geo_transform(&[0.0, 1.0, 0.0, 4.0, 0.0, -1.0])?;
/// src.rasterband(1)?.fill(42.0)?;
///
/// let mut dst = Dataset::create_with_band_type::<u8>(2, 2, 1)?;
/// dst.set_geo_transform(&[0.0, 2.0, 0.0, 4.0, 0.0, -2.0])?;
/// reproject_image(&src, &mut dst, &ReprojectOptions::new())?;
/// assert_eq!(dst.rasterband(1)?.read_band_as::<u8>()?.data, vec![42; 4]);
/// # Ok(())
/// # }
/// ```
pub fn reproject_image(src: &Dataset, dst: &mut Dataset, options: &ReprojectOptions) -> Result<()> {
    let plan = WarpPlan::new(src, dst, options)?;
    let warp = options.warp_options();
    let pool = if warp.multi() {
        let pool = build_pool(warp.num_threads())?;
        log::debug!("Multi-threaded warp on {} thread(s)", pool.current_num_threads());
        Some(pool)
    } else {
        None
    };

    if let Some(init) = warp.initial_value() {
        plan.initialize(init, options.dst_nodata())?;
    }
    plan.run(pool.as_ref())?;

    if let Some(nodata) = options.dst_nodata() {
        for band in &plan.dst_bands {
            band.clone().set_no_data_value(Some(nodata))?;
        }
    }
    Ok(())
}
