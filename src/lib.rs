//! Raster pixel I/O and reprojection for geospatial datasets.
//!
//! A [`Dataset`] holds equally sized raster bands plus their georeferencing: a
//! [`GeoTransform`] and a [`SpatialRef`](spatial_ref::SpatialRef). Pixels are read and
//! written through [`RasterBand`](raster::RasterBand)s, either as arbitrary windows
//! converted to any [`GdalType`](raster::GdalType) or as whole native storage blocks.
//!
//! [`raster::warp`] reprojects one dataset into another.
//!
//! ## Usage
//!
//! ```
//! # fn main() -> georaster::errors::Result<()> {
//! use georaster::raster::warp::{reproject_image, suggested_warp_output, ReprojectOptions};
//! use georaster::spatial_ref::SpatialRef;
//! use georaster::Dataset;
//!
//! let wgs84 = SpatialRef::from_epsg(4326)?;
//! let mercator = SpatialRef::from_epsg(3857)?;
//!
//! let src = Dataset::create_with_band_type::<u8>(64, 32, 1)?;
//! src.set_geo_transform(&[-10.0, 0.25, 0.0, 50.0, 0.0, -0.25])?;
//! src.set_spatial_ref(&wgs84)?;
//! src.rasterband(1)?.fill(200.0)?;
//!
//! let plan = suggested_warp_output(&src, &wgs84, &mercator)?;
//! let (width, height) = plan.raster_size;
//! let mut dst = Dataset::create_with_band_type::<u8>(width, height, 1)?;
//! dst.set_geo_transform(&plan.geo_transform)?;
//! dst.set_spatial_ref(&mercator)?;
//!
//! reproject_image(&src, &mut dst, &ReprojectOptions::new())?;
//! let centre = dst.rasterband(1)?.get_pixel(width as isize / 2, height as isize / 2)?;
//! assert_eq!(centre, 200.0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cpl;
mod dataset;
pub mod errors;
mod geo_transform;
mod options;
pub mod raster;
pub mod spatial_ref;

pub use dataset::Dataset;
pub use geo_transform::{GeoTransform, GeoTransformEx};
pub use options::{DatasetOptions, OpenFlags};

#[cfg(test)]
pub(crate) mod test_utils;
