use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use crate::dataset::Dataset;
use crate::errors::*;
use crate::raster::storage::{BandData, SharedBand, Window};
use crate::raster::{with_dyn_buffer, Buffer, DataType, DynBuffer, GdalType, Overviews, PixelBuffer};

#[cfg(feature = "ndarray")]
use ndarray::Array2;

/// Extra arguments for windowed reads and writes.
///
/// Strides are in bytes. Leaving them unset describes a tightly packed row-major buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterIOExtraArg {
    data_type: Option<DataType>,
    pixel_space: Option<usize>,
    line_space: Option<usize>,
}

impl RasterIOExtraArg {
    pub fn new() -> Self {
        Default::default()
    }

    /// Element type of buffers the band allocates itself.
    ///
    /// Ignored when the caller supplies the buffer, whose own element type wins.
    pub fn with_data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Byte offset between two horizontally adjacent buffer elements.
    pub fn with_pixel_space(&mut self, pixel_space: usize) -> &mut Self {
        self.pixel_space = Some(pixel_space);
        self
    }

    pub fn pixel_space(&self) -> Option<usize> {
        self.pixel_space
    }

    /// Byte offset between the starts of two consecutive buffer lines.
    pub fn with_line_space(&mut self, line_space: usize) -> &mut Self {
        self.line_space = Some(line_space);
        self
    }

    pub fn line_space(&self) -> Option<usize> {
        self.line_space
    }

    fn layout(&self, data_type: DataType, size: (usize, usize)) -> PixelBuffer {
        PixelBuffer::with_spacing(data_type, size, self.pixel_space, self.line_space)
    }
}

/// Represents a single band of a dataset.
///
/// A band shares ownership of its dataset's storage. Once the dataset is
/// [closed](Dataset::close) every call fails with [`RasterError::ClosedResource`].
#[derive(Debug, Clone)]
pub struct RasterBand {
    dataset: Dataset,
    data: SharedBand,
    number: usize,
}

impl RasterBand {
    pub(crate) fn new(dataset: Dataset, data: SharedBand, number: usize) -> Self {
        RasterBand {
            dataset,
            data,
            number,
        }
    }

    /// The dataset this band belongs to.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// 1-based index of this band in its dataset, `0` for overviews.
    pub fn band_number(&self) -> usize {
        self.number
    }

    /// Run `f` against the band's storage while holding the dataset open.
    pub(crate) fn with_data<R>(&self, f: impl FnOnce(&BandData) -> Result<R>) -> Result<R> {
        let _open = self.dataset.open_guard()?;
        let data = self.read_lock()?;
        f(&data)
    }

    fn with_data_mut<R>(&mut self, f: impl FnOnce(&mut BandData) -> Result<R>) -> Result<R> {
        let _open = self.dataset.open_guard()?;
        let mut data = self.write_lock()?;
        f(&mut data)
    }

    /// Like [`with_data_mut`](Self::with_data_mut) but refuses bands of read-only datasets.
    fn with_pixels_mut<R>(&mut self, f: impl FnOnce(&mut BandData) -> Result<R>) -> Result<R> {
        let _open = self.dataset.open_guard()?;
        if self.dataset.read_only() {
            return Err(RasterError::ReadOnly);
        }
        let mut data = self.write_lock()?;
        f(&mut data)
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, BandData>> {
        self.data
            .read()
            .map_err(|_| RasterError::UnexpectedLogicError("band lock poisoned".into()))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, BandData>> {
        self.data
            .write()
            .map_err(|_| RasterError::UnexpectedLogicError("band lock poisoned".into()))
    }

    /// Get block size from a 'Dataset'.
    pub fn block_size(&self) -> Result<(usize, usize)> {
        self.with_data(|d| Ok(d.block_size))
    }

    /// Get x-size of the band
    pub fn x_size(&self) -> Result<usize> {
        Ok(self.size()?.0)
    }

    /// Get y-size of the band
    pub fn y_size(&self) -> Result<usize> {
        Ok(self.size()?.1)
    }

    /// Get dimensions of the band.
    /// Note that this may not be the same as `size` on the
    /// `owning_dataset` due to scale.
    pub fn size(&self) -> Result<(usize, usize)> {
        self.with_data(|d| Ok(d.size))
    }

    /// Read data from this band into a slice, where `T` implements [`GdalType`]
    ///
    /// # Arguments
    /// * `window` - the window position from top left
    /// * `window_size` - the window size (nearest neighbour resampling if window_size != size)
    /// * `size` - the desired size to read
    /// * `buffer` - a slice to hold the data; it must hold at least `size.0 * size.1` elements
    /// * `options` - strides of `buffer`, see [`RasterIOExtraArg`]
    ///
    /// Values are converted to `T`, rounding to nearest and clamping for integer types.
    /// Buffer cells that map outside the band are set to zero.
    pub fn read_into_slice<T: GdalType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
        size: (usize, usize),
        buffer: &mut [T],
        options: Option<&RasterIOExtraArg>,
    ) -> Result<()> {
        let layout = options
            .copied()
            .unwrap_or_default()
            .layout(T::datatype(), size);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(buffer);
        self.with_data(|d| d.read_window(&Window::new(window, window_size), &layout, bytes))
    }

    /// Read a [`Buffer<T>`] from this band, where `T` implements [`GdalType`].
    ///
    /// # Arguments
    /// * `window` - the window position from top left
    /// * `window_size` - the window size (nearest neighbour resampling if window_size != size)
    /// * `size` - the desired size of the 'Buffer'
    /// * `options` - see [`RasterIOExtraArg`]; non-default strides must fit in `size.0 * size.1` elements
    ///
    /// # Example
    ///
    /// ```rust
    /// # fn main() -> georaster::errors::Result<()> {
    /// use georaster::Dataset;
    /// let dataset = Dataset::create_with_band_type::<u8>(10, 10, 1)?;
    /// let mut band1 = dataset.rasterband(1)?;
    /// band1.fill(7.0)?;
    /// let rv = band1.read_as::<u8>((8, 8), (4, 4), (4, 4), None)?;
    /// assert_eq!(rv.size, (4, 4));
    /// // cells past the band edge read as zero
    /// assert_eq!(rv.data[..4], [7, 7, 0, 0]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_as<T: GdalType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
        size: (usize, usize),
        options: Option<&RasterIOExtraArg>,
    ) -> Result<Buffer<T>> {
        let mut data = vec![T::default(); size.0 * size.1];
        self.read_into_slice(window, window_size, size, &mut data, options)?;
        Ok(Buffer { size, data })
    }

    /// Read into a newly allocated buffer whose element type is picked at runtime:
    /// `options.data_type()` when set, otherwise the band's own type.
    pub fn read_dyn(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
        size: (usize, usize),
        options: Option<&RasterIOExtraArg>,
    ) -> Result<DynBuffer> {
        let data_type = match options.and_then(|o| o.data_type()) {
            Some(dt) => dt,
            None => self.band_type()?,
        };
        let mut out = DynBuffer::zeroed(data_type, size);
        with_dyn_buffer!(&mut out, b => {
            self.read_into_slice(window, window_size, size, b.data.as_mut_slice(), options)?
        });
        Ok(out)
    }

    #[cfg(feature = "ndarray")]
    /// Read a [`Array2<T>`] from this band, where `T` implements [`GdalType`].
    ///
    /// # Arguments
    /// * `window` - the window position from top left
    /// * `window_size` - the window size (nearest neighbour resampling if window_size != array_size)
    /// * `array_size` - the desired size of the 'Array'
    ///
    /// # Docs
    /// The Matrix shape is (rows, cols) and raster shape is (cols in x-axis, rows in y-axis).
    pub fn read_as_array<T: GdalType>(
        &self,
        window: (isize, isize),
        window_size: (usize, usize),
        array_size: (usize, usize),
        options: Option<&RasterIOExtraArg>,
    ) -> Result<Array2<T>> {
        let data = self.read_as::<T>(window, window_size, array_size, options)?;

        // Matrix shape is (rows, cols) and raster shape is (cols in x-axis, rows in y-axis)
        Ok(Array2::from_shape_vec(
            (array_size.1, array_size.0),
            data.data,
        )?)
    }

    /// Read the full band as a [`Buffer<T>`], where `T` implements [`GdalType`].
    pub fn read_band_as<T: GdalType>(&self) -> Result<Buffer<T>> {
        let size = self.size()?;
        self.read_as::<T>((0, 0), size, size, None)
    }

    /// Write a [`Buffer<T>`] into the band.
    ///
    /// # Arguments
    /// * `window` - the window position from top left
    /// * `window_size` - the window size; the buffer is stretched over it with nearest neighbour
    ///   when `buffer.size` differs
    /// * `buffer` - the data to write into the window
    pub fn write<T: GdalType>(
        &mut self,
        window: (isize, isize),
        window_size: (usize, usize),
        buffer: &Buffer<T>,
    ) -> Result<()> {
        self.write_from_slice(window, window_size, buffer.size, &buffer.data, None)
    }

    /// Write `size.0 * size.1` elements laid out per `options` into the band.
    ///
    /// Window cells outside the band are left untouched.
    pub fn write_from_slice<T: GdalType>(
        &mut self,
        window: (isize, isize),
        window_size: (usize, usize),
        size: (usize, usize),
        buffer: &[T],
        options: Option<&RasterIOExtraArg>,
    ) -> Result<()> {
        let layout = options
            .copied()
            .unwrap_or_default()
            .layout(T::datatype(), size);
        let bytes: &[u8] = bytemuck::cast_slice(buffer);
        self.with_pixels_mut(|d| d.write_window(&Window::new(window, window_size), &layout, bytes))
    }

    /// Set every pixel to `value`, converted to the band type.
    pub fn fill(&mut self, value: f64) -> Result<()> {
        self.with_pixels_mut(|d| {
            d.fill(value);
            Ok(())
        })
    }

    /// Read the value of a single pixel.
    pub fn get_pixel(&self, x: isize, y: isize) -> Result<f64> {
        self.with_data(|d| d.get_pixel(x, y))
    }

    /// Set a single pixel, converting `value` to the band type.
    pub fn set_pixel(&mut self, x: isize, y: isize, value: f64) -> Result<()> {
        self.with_pixels_mut(|d| d.set_pixel(x, y, value))
    }

    fn check_block_type<T: GdalType>(&self) -> Result<()> {
        let expected = self.band_type()?;
        if T::datatype() != expected {
            return Err(RasterError::TypeMismatch {
                expected,
                actual: T::datatype(),
            });
        }
        Ok(())
    }

    /// Read one native block verbatim into `buffer`.
    ///
    /// `T` must be the band's own type. Padding past the raster edge reads as zero.
    pub fn read_block_into_slice<T: GdalType>(
        &self,
        block_index: (isize, isize),
        buffer: &mut [T],
    ) -> Result<()> {
        self.check_block_type::<T>()?;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(buffer);
        self.with_data(|d| d.read_block(block_index, bytes))
    }

    /// Read a [`Buffer<T>`] from a block, where `T` implements [`GdalType`]
    ///
    /// # Arguments
    /// * `block_index` - the block index, `(x, y)`
    ///
    /// # Example
    ///
    /// ```rust
    /// # fn main() -> georaster::errors::Result<()> {
    /// use georaster::{Dataset, DatasetOptions};
    /// let options = DatasetOptions { block_size: Some((4, 4)), ..Default::default() };
    /// let dataset = Dataset::create_with_options(10, 10, 1, georaster::raster::DataType::UInt8, &options)?;
    /// let band = dataset.rasterband(1)?;
    /// assert_eq!(band.block_size()?, (4, 4));
    /// let block = band.read_block::<u8>((2, 2))?;
    /// assert_eq!(block.size, (4, 4));
    /// assert_eq!(band.actual_block_size((2, 2))?, (2, 2));
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_block<T: GdalType>(&self, block_index: (isize, isize)) -> Result<Buffer<T>> {
        let size = self.block_size()?;
        let mut data = vec![T::default(); size.0 * size.1];
        self.read_block_into_slice(block_index, &mut data)?;
        Ok(Buffer::new(size, data))
    }

    #[cfg(feature = "ndarray")]
    /// Read a [`Array2<T>`] from a block, where `T` implements [`GdalType`]
    ///
    /// # Docs
    /// The Matrix shape is (rows, cols) and raster shape is (cols in x-axis, rows in y-axis).
    pub fn read_block_as_array<T: GdalType>(&self, block_index: (isize, isize)) -> Result<Array2<T>> {
        self.read_block::<T>(block_index)?.to_array()
    }

    /// Write one native block verbatim. Elements past the raster edge are ignored.
    pub fn write_block<T: GdalType>(
        &mut self,
        block_index: (isize, isize),
        block: &Buffer<T>,
    ) -> Result<()> {
        self.check_block_type::<T>()?;
        let bytes: &[u8] = bytemuck::cast_slice(&block.data);
        self.with_pixels_mut(|d| d.write_block(block_index, bytes))
    }

    /// Get actual block size (at the edges) when block size
    /// does not divide band size.
    pub fn actual_block_size(&self, block_index: (isize, isize)) -> Result<(usize, usize)> {
        self.with_data(|d| d.actual_block_size(block_index))
    }

    /// Number of blocks along x and y.
    pub fn block_count(&self) -> Result<(usize, usize)> {
        self.with_data(|d| Ok(d.block_count()))
    }

    pub fn band_type(&self) -> Result<DataType> {
        self.with_data(|d| Ok(d.data_type))
    }

    pub fn no_data_value(&self) -> Result<Option<f64>> {
        self.with_data(|d| Ok(d.no_data))
    }

    /// Set the no data value of this band.
    ///
    /// If `no_data` is `None`, any existing no data value is deleted.
    pub fn set_no_data_value(&mut self, no_data: Option<f64>) -> Result<()> {
        self.with_data_mut(|d| {
            d.no_data = no_data;
            Ok(())
        })
    }

    /// Value scale. Stored as metadata only, pixel I/O never applies it.
    pub fn scale(&self) -> Result<Option<f64>> {
        self.with_data(|d| Ok(d.scale))
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        self.with_data_mut(|d| {
            d.scale = Some(scale);
            Ok(())
        })
    }

    /// Value offset. Stored as metadata only, pixel I/O never applies it.
    pub fn offset(&self) -> Result<Option<f64>> {
        self.with_data(|d| Ok(d.offset))
    }

    pub fn set_offset(&mut self, offset: f64) -> Result<()> {
        self.with_data_mut(|d| {
            d.offset = Some(offset);
            Ok(())
        })
    }

    /// Unit of the pixel values, e.g. `m` for elevations. Empty when unknown.
    pub fn unit(&self) -> Result<String> {
        self.with_data(|d| Ok(d.unit_type.clone()))
    }

    pub fn set_unit(&mut self, unit: &str) -> Result<()> {
        self.with_data_mut(|d| {
            d.unit_type = unit.to_owned();
            Ok(())
        })
    }

    pub fn description(&self) -> Result<String> {
        self.with_data(|d| Ok(d.description.clone()))
    }

    pub fn set_description(&mut self, description: &str) -> Result<()> {
        self.with_data_mut(|d| {
            d.description = description.to_owned();
            Ok(())
        })
    }

    /// Read color interpretation of band
    pub fn color_interpretation(&self) -> Result<ColorInterpretation> {
        self.with_data(|d| Ok(d.color_interp))
    }

    /// Set color interpretation of band
    pub fn set_color_interpretation(&mut self, interp: ColorInterpretation) -> Result<()> {
        self.with_data_mut(|d| {
            d.color_interp = interp;
            Ok(())
        })
    }

    /// Number of reduced resolution levels.
    pub fn overview_count(&self) -> Result<usize> {
        self.with_data(|d| Ok(d.overviews.len()))
    }

    /// Overview `overview_index`, `0` being the highest resolution one.
    pub fn overview(&self, overview_index: usize) -> Result<RasterBand> {
        self.with_data(|d| {
            d.overviews
                .get(overview_index)
                .map(|(_, band)| RasterBand::new(self.dataset.clone(), band.clone(), 0))
                .ok_or(RasterError::OutOfRange {
                    what: "Overview",
                    index: overview_index as isize,
                    count: d.overviews.len(),
                })
        })
    }

    /// The band's overview pyramid as a lazily queried collection.
    pub fn overviews(&self) -> Overviews {
        Overviews::new(self.clone())
    }

    pub(crate) fn shared(&self) -> &SharedBand {
        &self.data
    }
}

/// Color interpretation of a band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColorInterpretation {
    #[default]
    Undefined,
    GrayIndex,
    PaletteIndex,
    RedBand,
    GreenBand,
    BlueBand,
    AlphaBand,
    HueBand,
    SaturationBand,
    LightnessBand,
    CyanBand,
    MagentaBand,
    YellowBand,
    BlackBand,
}

impl ColorInterpretation {
    const ALL: [ColorInterpretation; 14] = [
        ColorInterpretation::Undefined,
        ColorInterpretation::GrayIndex,
        ColorInterpretation::PaletteIndex,
        ColorInterpretation::RedBand,
        ColorInterpretation::GreenBand,
        ColorInterpretation::BlueBand,
        ColorInterpretation::AlphaBand,
        ColorInterpretation::HueBand,
        ColorInterpretation::SaturationBand,
        ColorInterpretation::LightnessBand,
        ColorInterpretation::CyanBand,
        ColorInterpretation::MagentaBand,
        ColorInterpretation::YellowBand,
        ColorInterpretation::BlackBand,
    ];

    /// Creates a color interpretation from its name, case-insensitively.
    ///
    /// Unknown names map to [`ColorInterpretation::Undefined`].
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .unwrap_or(ColorInterpretation::Undefined))
    }

    /// Returns the name of this color interpretation.
    pub fn name(&self) -> &'static str {
        match self {
            ColorInterpretation::Undefined => "Undefined",
            ColorInterpretation::GrayIndex => "Gray",
            ColorInterpretation::PaletteIndex => "Palette",
            ColorInterpretation::RedBand => "Red",
            ColorInterpretation::GreenBand => "Green",
            ColorInterpretation::BlueBand => "Blue",
            ColorInterpretation::AlphaBand => "Alpha",
            ColorInterpretation::HueBand => "Hue",
            ColorInterpretation::SaturationBand => "Saturation",
            ColorInterpretation::LightnessBand => "Lightness",
            ColorInterpretation::CyanBand => "Cyan",
            ColorInterpretation::MagentaBand => "Magenta",
            ColorInterpretation::YellowBand => "Yellow",
            ColorInterpretation::BlackBand => "Black",
        }
    }
}
