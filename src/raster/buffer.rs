use crate::errors::{RasterError, Result};
use crate::raster::{DataType, GdalType};

#[cfg(feature = "ndarray")]
use ndarray::Array2;

/// A 2-D array backed by it's `size` (cols, rows) and a row-major `Vec<T>` and it's dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer<T> {
    pub size: (usize, usize),
    pub data: Vec<T>,
}

impl<T: GdalType> Buffer<T> {
    /// Construct a new buffer from `size` (`(cols, rows)`) and `Vec<T>`.
    ///
    /// # Panic
    /// Will panic if `size.0 * size.1 != data.len()`.
    pub fn new(size: (usize, usize), data: Vec<T>) -> Self {
        assert_eq!(
            size.0 * size.1,
            data.len(),
            "size {:?} does not match length {}",
            size,
            data.len()
        );
        Buffer { size, data }
    }

    /// Construct a buffer of `size` with every element set to `T::default()`.
    pub fn zeroed(size: (usize, usize)) -> Self {
        Buffer {
            size,
            data: vec![T::default(); size.0 * size.1],
        }
    }

    /// Element at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.size.0 {
            return None;
        }
        self.data.get(y * self.size.0 + x).copied()
    }

    #[cfg(feature = "ndarray")]
    /// Convert `self` into an [`ndarray::Array2`].
    pub fn to_array(self) -> Result<Array2<T>> {
        // Array2 shape is (rows, cols) and Buffer shape is (cols in x-axis, rows in y-axis)
        Ok(Array2::from_shape_vec(
            (self.size.1, self.size.0),
            self.data,
        )?)
    }
}

pub type ByteBuffer = Buffer<u8>;

#[cfg(feature = "ndarray")]
impl<T: GdalType> TryFrom<Buffer<T>> for Array2<T> {
    type Error = RasterError;

    fn try_from(value: Buffer<T>) -> Result<Self> {
        value.to_array()
    }
}

#[cfg(feature = "ndarray")]
impl<T: GdalType + Copy> From<Array2<T>> for Buffer<T> {
    fn from(value: Array2<T>) -> Self {
        // Array2 shape is (rows, cols) and Buffer shape is (cols in x-axis, rows in y-axis)
        let shape = value.shape();
        let (rows, cols) = (shape[0], shape[1]);
        let data = value
            .as_standard_layout()
            .iter()
            .copied()
            .collect::<Vec<T>>();
        Buffer::new((cols, rows), data)
    }
}

/// A [`Buffer`] whose element type is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum DynBuffer {
    UInt8(Buffer<u8>),
    Int8(Buffer<i8>),
    UInt16(Buffer<u16>),
    Int16(Buffer<i16>),
    UInt32(Buffer<u32>),
    Int32(Buffer<i32>),
    UInt64(Buffer<u64>),
    Int64(Buffer<i64>),
    Float32(Buffer<f32>),
    Float64(Buffer<f64>),
}

/// Evaluate `$body` with `$buf` bound to the typed buffer inside a [`DynBuffer`].
macro_rules! with_dyn_buffer {
    ($value:expr, $buf:ident => $body:expr) => {
        match $value {
            DynBuffer::UInt8($buf) => $body,
            DynBuffer::Int8($buf) => $body,
            DynBuffer::UInt16($buf) => $body,
            DynBuffer::Int16($buf) => $body,
            DynBuffer::UInt32($buf) => $body,
            DynBuffer::Int32($buf) => $body,
            DynBuffer::UInt64($buf) => $body,
            DynBuffer::Int64($buf) => $body,
            DynBuffer::Float32($buf) => $body,
            DynBuffer::Float64($buf) => $body,
        }
    };
}
pub(crate) use with_dyn_buffer;

impl DynBuffer {
    /// Allocate a zeroed buffer of `data_type` elements.
    pub fn zeroed(data_type: DataType, size: (usize, usize)) -> Self {
        match data_type {
            DataType::UInt8 => DynBuffer::UInt8(Buffer::zeroed(size)),
            DataType::Int8 => DynBuffer::Int8(Buffer::zeroed(size)),
            DataType::UInt16 => DynBuffer::UInt16(Buffer::zeroed(size)),
            DataType::Int16 => DynBuffer::Int16(Buffer::zeroed(size)),
            DataType::UInt32 => DynBuffer::UInt32(Buffer::zeroed(size)),
            DataType::Int32 => DynBuffer::Int32(Buffer::zeroed(size)),
            DataType::UInt64 => DynBuffer::UInt64(Buffer::zeroed(size)),
            DataType::Int64 => DynBuffer::Int64(Buffer::zeroed(size)),
            DataType::Float32 => DynBuffer::Float32(Buffer::zeroed(size)),
            DataType::Float64 => DynBuffer::Float64(Buffer::zeroed(size)),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            DynBuffer::UInt8(_) => DataType::UInt8,
            DynBuffer::Int8(_) => DataType::Int8,
            DynBuffer::UInt16(_) => DataType::UInt16,
            DynBuffer::Int16(_) => DataType::Int16,
            DynBuffer::UInt32(_) => DataType::UInt32,
            DynBuffer::Int32(_) => DataType::Int32,
            DynBuffer::UInt64(_) => DataType::UInt64,
            DynBuffer::Int64(_) => DataType::Int64,
            DynBuffer::Float32(_) => DataType::Float32,
            DynBuffer::Float64(_) => DataType::Float64,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        with_dyn_buffer!(self, b => b.size)
    }

    /// Element at column `x`, row `y`, widened to `f64`.
    pub fn get_f64(&self, x: usize, y: usize) -> Option<f64> {
        with_dyn_buffer!(self, b => b.get(x, y).map(GdalType::to_f64))
    }

    /// The typed buffer, if `T` matches the runtime element type.
    pub fn as_buffer<T: GdalType>(&self) -> Option<&Buffer<T>> {
        with_dyn_buffer!(self, b => (b as &dyn std::any::Any).downcast_ref::<Buffer<T>>())
    }
}

impl<T: GdalType> From<Buffer<T>> for DynBuffer {
    fn from(value: Buffer<T>) -> Self {
        let mut out = DynBuffer::zeroed(T::datatype(), (0, 0));
        with_dyn_buffer!(&mut out, b => {
            b.size = value.size;
            b.data = value
                .data
                .iter()
                .map(|v| GdalType::from_sample(v.to_sample()))
                .collect();
        });
        out
    }
}

/// Memory layout of a pixel buffer used by windowed I/O.
///
/// Strides are in bytes, measured from the first element the call touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBuffer {
    pub data_type: DataType,
    pub width: usize,
    pub height: usize,
    pub pixel_space: usize,
    pub line_space: usize,
}

impl PixelBuffer {
    /// A tightly packed row-major layout.
    pub fn packed(data_type: DataType, width: usize, height: usize) -> Self {
        let pixel_space = data_type.bytes();
        PixelBuffer {
            data_type,
            width,
            height,
            pixel_space,
            line_space: pixel_space * width,
        }
    }

    /// Layout with optional stride overrides; unset strides default to packed.
    pub fn with_spacing(
        data_type: DataType,
        size: (usize, usize),
        pixel_space: Option<usize>,
        line_space: Option<usize>,
    ) -> Self {
        let pixel_space = pixel_space.unwrap_or(data_type.bytes());
        PixelBuffer {
            data_type,
            width: size.0,
            height: size.1,
            pixel_space,
            line_space: line_space.unwrap_or(pixel_space * size.0),
        }
    }

    /// Smallest number of addressable bytes holding every element of the layout.
    pub fn required_bytes(&self) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        self.line_space * (self.height - 1)
            + self.pixel_space * (self.width - 1)
            + self.data_type.bytes()
    }

    /// Byte offset of element (`x`, `y`).
    pub fn offset(&self, x: usize, y: usize) -> usize {
        y * self.line_space + x * self.pixel_space
    }

    /// Check stride invariants and that `available_bytes` covers the layout.
    pub fn validate(&self, available_bytes: usize) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::BadArgument(format!(
                "Buffer size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let elem = self.data_type.bytes();
        if self.pixel_space < elem {
            return Err(RasterError::BadArgument(format!(
                "pixel_space ({}) must be at least the element size ({elem})",
                self.pixel_space
            )));
        }
        if self.line_space < self.pixel_space * self.width {
            return Err(RasterError::BadArgument(format!(
                "line_space ({}) must be at least pixel_space * width ({})",
                self.line_space,
                self.pixel_space * self.width
            )));
        }
        let required = self.required_bytes();
        if available_bytes < required {
            return Err(RasterError::BufferTooSmall {
                required: required.div_ceil(elem),
                actual: available_bytes / elem,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_length_bound() {
        // Three interleaved u8 channels over a 4x2 window, viewed from byte 1 and byte 2.
        let layout = PixelBuffer::with_spacing(DataType::UInt8, (4, 2), Some(3), None);
        assert_eq!(layout.line_space, 12);
        assert_eq!(layout.required_bytes(), 12 + 9 + 1);
        let total = 4 * 2 * 3;
        assert!(layout.validate(total - 1).is_ok());
        assert!(matches!(
            layout.validate(total - 2),
            Err(RasterError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn bad_strides() {
        let layout = PixelBuffer::with_spacing(DataType::Int16, (4, 2), Some(1), None);
        assert!(matches!(
            layout.validate(1024),
            Err(RasterError::BadArgument(_))
        ));
        let layout = PixelBuffer::with_spacing(DataType::UInt8, (4, 2), Some(2), Some(6));
        assert!(matches!(
            layout.validate(1024),
            Err(RasterError::BadArgument(_))
        ));
    }

    #[test]
    fn dyn_buffer_accessors() {
        let buf = DynBuffer::from(Buffer::new((2, 2), vec![1i16, 2, 3, -4]));
        assert_eq!(buf.data_type(), DataType::Int16);
        assert_eq!(buf.size(), (2, 2));
        assert_eq!(buf.get_f64(1, 1), Some(-4.0));
        assert_eq!(buf.get_f64(2, 0), None);
        assert!(buf.as_buffer::<i16>().is_some());
        assert!(buf.as_buffer::<u16>().is_none());
    }
}
