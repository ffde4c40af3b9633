//! In-memory band storage.
//!
//! Pixels are kept row-major in native byte order. Every routine here works on
//! raw bytes and a [`DataType`]; typing happens one level up in [`RasterBand`].
//!
//! [`RasterBand`]: crate::raster::RasterBand

use std::sync::{Arc, RwLock};

use crate::errors::{RasterError, Result};
use crate::raster::{converter, ColorInterpretation, DataType, PixelBuffer};

pub(crate) type SharedBand = Arc<RwLock<BandData>>;

/// A window of a band, in pixel/line coordinates. The origin may lie outside the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub x: isize,
    pub y: isize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(origin: (isize, isize), size: (usize, usize)) -> Self {
        Window {
            x: origin.0,
            y: origin.1,
            width: size.0,
            height: size.1,
        }
    }
}

#[derive(Debug)]
pub(crate) struct BandData {
    pub data_type: DataType,
    pub size: (usize, usize),
    pub block_size: (usize, usize),
    pub pixels: Vec<u8>,
    pub no_data: Option<f64>,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub unit_type: String,
    pub description: String,
    pub color_interp: ColorInterpretation,
    /// Reduced resolution levels as `(decimation factor, band)`, highest resolution first.
    pub overviews: Vec<(usize, SharedBand)>,
}

impl BandData {
    pub fn new(data_type: DataType, size: (usize, usize), block_size: (usize, usize)) -> Self {
        BandData {
            data_type,
            size,
            block_size: (block_size.0.max(1), block_size.1.max(1)),
            pixels: vec![0u8; size.0 * size.1 * data_type.bytes()],
            no_data: None,
            scale: None,
            offset: None,
            unit_type: String::new(),
            description: String::new(),
            color_interp: ColorInterpretation::Undefined,
            overviews: Vec::new(),
        }
    }

    /// Number of blocks along each axis.
    pub fn block_count(&self) -> (usize, usize) {
        (
            self.size.0.div_ceil(self.block_size.0),
            self.size.1.div_ceil(self.block_size.1),
        )
    }

    fn pixel_offset(&self, x: usize, y: usize) -> usize {
        (y * self.size.0 + x) * self.data_type.bytes()
    }

    fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size.0 && (y as usize) < self.size.1
    }

    fn check_window(&self, window: &Window) -> Result<()> {
        if window.width == 0 || window.height == 0 {
            return Err(RasterError::BadArgument(format!(
                "Window size must be positive, got {}x{}",
                window.width, window.height
            )));
        }
        let (w, h) = (self.size.0 as isize, self.size.1 as isize);
        let intersects = window.x < w
            && window.y < h
            && window.x.saturating_add(window.width as isize) > 0
            && window.y.saturating_add(window.height as isize) > 0;
        if !intersects {
            return Err(RasterError::OutOfBounds {
                x: window.x,
                y: window.y,
                width: window.width,
                height: window.height,
                raster_size: self.size,
            });
        }
        Ok(())
    }

    /// Read `window` into `buf` laid out per `layout`, resampling with nearest
    /// neighbour when the buffer and window sizes differ.
    ///
    /// Buffer cells that map outside the band are zeroed.
    pub fn read_window(&self, window: &Window, layout: &PixelBuffer, buf: &mut [u8]) -> Result<()> {
        self.check_window(window)?;
        layout.validate(buf.len())?;

        let convert = converter(self.data_type, layout.data_type);
        let src_bytes = self.data_type.bytes();
        let dst_bytes = layout.data_type.bytes();
        let x_map = nearest_map(layout.width, window.width);
        let y_map = nearest_map(layout.height, window.height);

        for (by, sy) in y_map.iter().enumerate() {
            let sy = window.y + *sy as isize;
            for (bx, sx) in x_map.iter().enumerate() {
                let sx = window.x + *sx as isize;
                let out = layout.offset(bx, by);
                let dst = &mut buf[out..out + dst_bytes];
                if self.contains(sx, sy) {
                    let idx = self.pixel_offset(sx as usize, sy as usize);
                    convert(&self.pixels[idx..idx + src_bytes], dst);
                } else {
                    dst.fill(0);
                }
            }
        }
        Ok(())
    }

    /// Write `buf` laid out per `layout` into `window`. Window cells outside the band are skipped.
    pub fn write_window(&mut self, window: &Window, layout: &PixelBuffer, buf: &[u8]) -> Result<()> {
        self.check_window(window)?;
        layout.validate(buf.len())?;

        let convert = converter(layout.data_type, self.data_type);
        let src_bytes = layout.data_type.bytes();
        let dst_bytes = self.data_type.bytes();
        let x_map = nearest_map(window.width, layout.width);
        let y_map = nearest_map(window.height, layout.height);

        for (wy, by) in y_map.iter().enumerate() {
            let ty = window.y + wy as isize;
            for (wx, bx) in x_map.iter().enumerate() {
                let tx = window.x + wx as isize;
                if !self.contains(tx, ty) {
                    continue;
                }
                let input = layout.offset(*bx, *by);
                let idx = self.pixel_offset(tx as usize, ty as usize);
                convert(
                    &buf[input..input + src_bytes],
                    &mut self.pixels[idx..idx + dst_bytes],
                );
            }
        }
        Ok(())
    }

    fn check_block(&self, block_index: (isize, isize)) -> Result<(usize, usize)> {
        let (nx, ny) = self.block_count();
        if block_index.0 < 0 || block_index.0 as usize >= nx {
            return Err(RasterError::OutOfRange {
                what: "Block x",
                index: block_index.0,
                count: nx,
            });
        }
        if block_index.1 < 0 || block_index.1 as usize >= ny {
            return Err(RasterError::OutOfRange {
                what: "Block y",
                index: block_index.1,
                count: ny,
            });
        }
        Ok((block_index.0 as usize, block_index.1 as usize))
    }

    /// Portion of block `block_index` that lies inside the raster.
    pub fn actual_block_size(&self, block_index: (isize, isize)) -> Result<(usize, usize)> {
        let (bx, by) = self.check_block(block_index)?;
        let (bw, bh) = self.block_size;
        Ok((
            bw.min(self.size.0 - bx * bw),
            bh.min(self.size.1 - by * bh),
        ))
    }

    fn block_bytes(&self) -> usize {
        self.block_size.0 * self.block_size.1 * self.data_type.bytes()
    }

    /// Copy one block verbatim into `buf`, zero filling the part past the raster edge.
    pub fn read_block(&self, block_index: (isize, isize), buf: &mut [u8]) -> Result<()> {
        let (valid_w, valid_h) = self.actual_block_size(block_index)?;
        let required = self.block_bytes();
        let elem = self.data_type.bytes();
        if buf.len() < required {
            return Err(RasterError::BufferTooSmall {
                required: required / elem,
                actual: buf.len() / elem,
            });
        }
        let (bw, bh) = self.block_size;
        let (x0, y0) = (block_index.0 as usize * bw, block_index.1 as usize * bh);
        buf[..required].fill(0);
        for row in 0..valid_h {
            let src = self.pixel_offset(x0, y0 + row);
            let dst = row * bw * elem;
            buf[dst..dst + valid_w * elem].copy_from_slice(&self.pixels[src..src + valid_w * elem]);
        }
        Ok(())
    }

    /// Copy one block verbatim from `buf`, ignoring the part past the raster edge.
    pub fn write_block(&mut self, block_index: (isize, isize), buf: &[u8]) -> Result<()> {
        let (valid_w, valid_h) = self.actual_block_size(block_index)?;
        let required = self.block_bytes();
        let elem = self.data_type.bytes();
        if buf.len() < required {
            return Err(RasterError::BufferTooSmall {
                required: required / elem,
                actual: buf.len() / elem,
            });
        }
        let (bw, bh) = self.block_size;
        let (x0, y0) = (block_index.0 as usize * bw, block_index.1 as usize * bh);
        for row in 0..valid_h {
            let dst = self.pixel_offset(x0, y0 + row);
            let src = row * bw * elem;
            self.pixels[dst..dst + valid_w * elem].copy_from_slice(&buf[src..src + valid_w * elem]);
        }
        Ok(())
    }

    pub fn fill(&mut self, value: f64) {
        let elem = self.data_type.bytes();
        let mut encoded = [0u8; 8];
        self.data_type.write_f64(value, &mut encoded);
        for px in self.pixels.chunks_exact_mut(elem) {
            px.copy_from_slice(&encoded[..elem]);
        }
    }

    fn check_pixel(&self, x: isize, y: isize) -> Result<usize> {
        if !self.contains(x, y) {
            return Err(RasterError::OutOfBounds {
                x,
                y,
                width: 1,
                height: 1,
                raster_size: self.size,
            });
        }
        Ok(self.pixel_offset(x as usize, y as usize))
    }

    pub fn get_pixel(&self, x: isize, y: isize) -> Result<f64> {
        let idx = self.check_pixel(x, y)?;
        Ok(self.data_type.read_f64(&self.pixels[idx..]))
    }

    pub fn set_pixel(&mut self, x: isize, y: isize, value: f64) -> Result<()> {
        let idx = self.check_pixel(x, y)?;
        let elem = self.data_type.bytes();
        self.data_type
            .write_f64(value, &mut self.pixels[idx..idx + elem]);
        Ok(())
    }

    /// Build a decimated copy of this band for an overview level.
    pub fn decimate(&self, factor: usize, average: bool) -> BandData {
        let ow = self.size.0.div_ceil(factor).max(1);
        let oh = self.size.1.div_ceil(factor).max(1);
        let block = (self.block_size.0.min(ow), self.block_size.1.min(oh));
        let mut out = BandData::new(self.data_type, (ow, oh), block);
        out.no_data = self.no_data;
        out.scale = self.scale;
        out.offset = self.offset;
        out.unit_type = self.unit_type.clone();
        out.color_interp = self.color_interp;

        let elem = self.data_type.bytes();
        let sx = self.size.0 as f64 / ow as f64;
        let sy = self.size.1 as f64 / oh as f64;
        for oy in 0..oh {
            for ox in 0..ow {
                let value = if average {
                    let x0 = (ox as f64 * sx) as usize;
                    let x1 = (((ox + 1) as f64 * sx) as usize).clamp(x0 + 1, self.size.0);
                    let y0 = (oy as f64 * sy) as usize;
                    let y1 = (((oy + 1) as f64 * sy) as usize).clamp(y0 + 1, self.size.1);
                    self.average(x0..x1, y0..y1)
                } else {
                    let x = (((ox as f64 + 0.5) * sx) as usize).min(self.size.0 - 1);
                    let y = (((oy as f64 + 0.5) * sy) as usize).min(self.size.1 - 1);
                    self.data_type.read_f64(&self.pixels[self.pixel_offset(x, y)..])
                };
                let idx = out.pixel_offset(ox, oy);
                out.data_type.write_f64(value, &mut out.pixels[idx..idx + elem]);
            }
        }
        out
    }

    fn average(&self, xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for y in ys {
            for x in xs.clone() {
                let v = self.data_type.read_f64(&self.pixels[self.pixel_offset(x, y)..]);
                if self.no_data.is_some_and(|nd| nd == v) || v.is_nan() {
                    continue;
                }
                sum += v;
                count += 1;
            }
        }
        if count == 0 {
            self.no_data.unwrap_or(0.0)
        } else {
            sum / count as f64
        }
    }
}

/// For each of `count` target cells, the source cell index picked by nearest neighbour
/// when `source` cells are stretched over `count`.
fn nearest_map(count: usize, source: usize) -> Vec<usize> {
    let ratio = source as f64 / count as f64;
    (0..count)
        .map(|i| (((i as f64 + 0.5) * ratio) as usize).min(source - 1))
        .collect()
}
