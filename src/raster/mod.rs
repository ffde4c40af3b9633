//! Raster bands and pixel I/O
//!
//! Bands are reached through [`Dataset::rasterband`](crate::Dataset::rasterband).
//! Windowed reads and writes convert between the band type and any [`GdalType`],
//! block reads copy one native storage block verbatim.

mod buffer;
mod checksum;
mod overviews;
mod rasterband;
mod storage;
mod types;
pub mod warp;

pub(crate) use buffer::with_dyn_buffer;
pub use buffer::{Buffer, ByteBuffer, DynBuffer, PixelBuffer};
pub use checksum::checksum_image;
pub use overviews::{OverviewIterator, Overviews};
pub use rasterband::{ColorInterpretation, RasterBand, RasterIOExtraArg};
pub(crate) use storage::{BandData, SharedBand};
#[doc(hidden)]
pub use types::Sample;
pub use types::{converter, ConvertFn, DataType, GdalType};
