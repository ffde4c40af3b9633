use thiserror::Error;

use crate::raster::DataType;

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RasterError {
    #[error("{what} already closed")]
    ClosedResource { what: &'static str },
    #[error("Window ({x}, {y}, {width}x{height}) is out of bounds for raster of size {raster_size:?}")]
    OutOfBounds {
        x: isize,
        y: isize,
        width: usize,
        height: usize,
        raster_size: (usize, usize),
    },
    #[error("{what} index {index} out of range [0, {count})")]
    OutOfRange {
        what: &'static str,
        index: isize,
        count: usize,
    },
    #[error("Array length must be greater than or equal to {required}, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },
    #[error("Buffer type {actual} does not match band type {expected}")]
    TypeMismatch { expected: DataType, actual: DataType },
    #[error("Band is read-only")]
    ReadOnly,
    #[error("Cutline must be a Polygon or MultiPolygon, got {0}")]
    InvalidCutlineType(String),
    #[error("{0}")]
    PairedOptionMissing(String),
    #[error("{what} band {index} out of range for dataset with {count} bands")]
    BandOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },
    #[error("dfWarpMemoryLimit={limit} is unreasonably small (minimum {minimum})")]
    MemoryLimitTooSmall { limit: usize, minimum: usize },
    #[error("Cannot find coordinate operations from `{from}' to `{to}': {msg}")]
    TransformError {
        from: String,
        to: String,
        msg: String,
    },
    #[error("Invalid coordinate range while transforming points from {from} to {to}: {msg:?}")]
    InvalidCoordinateRange {
        from: String,
        to: String,
        msg: Option<String>,
    },
    #[error("{what} must be a raster dataset: {msg}")]
    NotARaster { what: &'static str, msg: String },
    #[error("BadArgument error: {0}")]
    BadArgument(String),
    #[error("Unexpected logic error: {0}")]
    UnexpectedLogicError(String),
    #[cfg(feature = "ndarray")]
    #[error(transparent)]
    NdarrayShapeError(#[from] ndarray::ShapeError),
}
