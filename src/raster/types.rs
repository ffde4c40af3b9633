use std::fmt::{Debug, Display, Formatter};

use crate::errors::{RasterError, Result};

/// Pixel data types supported by raster bands.
///
/// Ordinals index the conversion table returned by [`converter`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(u8)]
pub enum DataType {
    /// Eight bit unsigned integer
    UInt8 = 0,
    /// Eight bit signed integer
    Int8 = 1,
    /// Sixteen bit unsigned integer
    UInt16 = 2,
    /// Sixteen bit signed integer
    Int16 = 3,
    /// Thirty two bit unsigned integer
    UInt32 = 4,
    /// Thirty two bit signed integer
    Int32 = 5,
    /// 64 bit unsigned integer
    UInt64 = 6,
    /// 64 bit signed integer
    Int64 = 7,
    /// Thirty two bit floating point
    Float32 = 8,
    /// Sixty four bit floating point
    Float64 = 9,
}

impl DataType {
    /// Every supported type, in ordinal order.
    pub const ALL: [DataType; 10] = [
        DataType::UInt8,
        DataType::Int8,
        DataType::UInt16,
        DataType::Int16,
        DataType::UInt32,
        DataType::Int32,
        DataType::UInt64,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
    ];

    /// Get the name of the data type, as GDAL spells it.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::UInt8 => "Byte",
            DataType::Int8 => "Int8",
            DataType::UInt16 => "UInt16",
            DataType::Int16 => "Int16",
            DataType::UInt32 => "UInt32",
            DataType::Int32 => "Int32",
            DataType::UInt64 => "UInt64",
            DataType::Int64 => "Int64",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        }
    }

    /// Get the type size in **bits**.
    pub fn bits(&self) -> u8 {
        (self.bytes() * 8) as u8
    }

    /// Get the type size in **bytes**.
    pub fn bytes(&self) -> usize {
        match self {
            DataType::UInt8 | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float32 => 4,
            DataType::UInt64 | DataType::Int64 | DataType::Float64 => 8,
        }
    }

    /// Returns `true` if data type is integral (non-floating point)
    pub fn is_integer(&self) -> bool {
        !self.is_floating()
    }

    /// Returns `true` if data type is floating point (non-integral)
    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Decode one element stored in native byte order into `f64`.
    pub(crate) fn read_f64(&self, bytes: &[u8]) -> f64 {
        let mut out = [0u8; 8];
        converter(*self, DataType::Float64)(bytes, &mut out);
        f64::from_ne_bytes(out)
    }

    /// Encode `value` as one element in native byte order, rounding and clamping as needed.
    pub(crate) fn write_f64(&self, value: f64, bytes: &mut [u8]) {
        converter(DataType::Float64, *self)(&value.to_ne_bytes(), bytes);
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for DataType {
    type Error = RasterError;

    fn try_from(value: u8) -> Result<Self> {
        DataType::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| RasterError::BadArgument(format!("unknown data type ordinal {value}")))
    }
}

/// Intermediate representation used while converting between pixel types.
///
/// Integers travel as `i128` so no 64 bit value loses precision on the way.
#[doc(hidden)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Sample {
    Int(i128),
    Float(f64),
}

/// Type-level constraint for limiting which primitive numeric values can be passed
/// to functions needing target data type.
pub trait GdalType: bytemuck::Pod + Default + Debug + PartialEq + Send + Sync + 'static {
    fn datatype() -> DataType;

    #[doc(hidden)]
    fn to_sample(self) -> Sample;

    #[doc(hidden)]
    fn from_sample(sample: Sample) -> Self;

    /// Convert to `f64`, the working type of the reprojection engine.
    fn to_f64(self) -> f64 {
        match self.to_sample() {
            Sample::Int(v) => v as f64,
            Sample::Float(v) => v,
        }
    }

    /// Convert from `f64`, rounding to nearest and clamping for integer types.
    fn from_f64(value: f64) -> Self {
        Self::from_sample(Sample::Float(value))
    }
}

macro_rules! impl_integer_type {
    ($t:ty, $dt:ident) => {
        impl GdalType for $t {
            fn datatype() -> DataType {
                DataType::$dt
            }

            fn to_sample(self) -> Sample {
                Sample::Int(self as i128)
            }

            fn from_sample(sample: Sample) -> Self {
                let v = match sample {
                    Sample::Int(v) => v,
                    Sample::Float(v) if v.is_nan() => 0,
                    // `as` saturates at the i128 range
                    Sample::Float(v) => v.round() as i128,
                };
                v.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t
            }
        }
    };
}

macro_rules! impl_float_type {
    ($t:ty, $dt:ident) => {
        impl GdalType for $t {
            fn datatype() -> DataType {
                DataType::$dt
            }

            fn to_sample(self) -> Sample {
                Sample::Float(self as f64)
            }

            fn from_sample(sample: Sample) -> Self {
                match sample {
                    Sample::Int(v) => v as $t,
                    Sample::Float(v) => v as $t,
                }
            }
        }
    };
}

impl_integer_type!(u8, UInt8);
impl_integer_type!(i8, Int8);
impl_integer_type!(u16, UInt16);
impl_integer_type!(i16, Int16);
impl_integer_type!(u32, UInt32);
impl_integer_type!(i32, Int32);
impl_integer_type!(u64, UInt64);
impl_integer_type!(i64, Int64);
impl_float_type!(f32, Float32);
impl_float_type!(f64, Float64);

/// Converts one native-endian element of one type into another.
///
/// The source slice must hold at least `src.bytes()` bytes, the destination `dst.bytes()`.
pub type ConvertFn = fn(&[u8], &mut [u8]);

fn convert_element<S: GdalType, D: GdalType>(src: &[u8], dst: &mut [u8]) {
    let value: S = bytemuck::pod_read_unaligned(&src[..std::mem::size_of::<S>()]);
    let converted = D::from_sample(value.to_sample());
    dst[..std::mem::size_of::<D>()].copy_from_slice(bytemuck::bytes_of(&converted));
}

macro_rules! conversion_row {
    ($s:ty) => {
        [
            convert_element::<$s, u8>,
            convert_element::<$s, i8>,
            convert_element::<$s, u16>,
            convert_element::<$s, i16>,
            convert_element::<$s, u32>,
            convert_element::<$s, i32>,
            convert_element::<$s, u64>,
            convert_element::<$s, i64>,
            convert_element::<$s, f32>,
            convert_element::<$s, f64>,
        ]
    };
}

static CONVERSIONS: [[ConvertFn; 10]; 10] = [
    conversion_row!(u8),
    conversion_row!(i8),
    conversion_row!(u16),
    conversion_row!(i16),
    conversion_row!(u32),
    conversion_row!(i32),
    conversion_row!(u64),
    conversion_row!(i64),
    conversion_row!(f32),
    conversion_row!(f64),
];

/// Look up the element conversion from `src` to `dst`.
pub fn converter(src: DataType, dst: DataType) -> ConvertFn {
    CONVERSIONS[src as usize][dst as usize]
}
