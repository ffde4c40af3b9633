//! Raster reprojection.
//!
//! [`suggested_warp_output`] plans the size and geotransform of a destination raster
//! covering a source raster in another spatial reference system, and
//! [`reproject_image`] resamples the source pixels into it.
//!
//! See also:
//! * [Warp API Tutorial](https://gdal.org/tutorials/warp_tut.html)
//! * [`gdalwarp` Program](https://gdal.org/programs/gdalwarp.html#gdalwarp)

mod approx;
mod cutline;
mod engine;
mod reproject_options;
mod resample;
mod warp_options;

pub use engine::reproject_image;
pub use reproject_options::*;
pub use resample::WarpResampleAlg;
pub use warp_options::*;

use crate::dataset::Dataset;
use crate::errors::*;
use crate::spatial_ref::{CoordTransform, SpatialRef};
use crate::{GeoTransform, GeoTransformEx};

/// Output of [`suggested_warp_output`]: a north-up destination grid with square pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestedWarpOutput {
    pub geo_transform: GeoTransform,
    /// `(width, height)` in pixels.
    pub raster_size: (usize, usize),
}

/// Suggest the destination grid for warping `src` from `s_srs` to `t_srs`.
///
/// The extent is the bounding box of the transformed source corners. The resolution
/// keeps the length of the source diagonal, in pixels, unchanged.
///
/// Fails with [`RasterError::TransformError`] when no transformation exists between
/// the two systems.
///
/// # Example
///
/// ```rust
/// # fn main() -> georaster::errors::Result<()> {
/// use georaster::raster::warp::suggested_warp_output;
/// use georaster::spatial_ref::SpatialRef;
/// use georaster::Dataset;
///
/// let src = Dataset::create_with_band_type::<u8>(360, 180, 1)?;
/// src.set_geo_transform(&[-180.0, 1.0, 0.0, 85.0, 0.0, -170.0 / 180.0])?;
/// let wgs84 = SpatialRef::from_epsg(4326)?;
/// let mercator = SpatialRef::from_epsg(3857)?;
///
/// let out = suggested_warp_output(&src, &wgs84, &mercator)?;
/// assert_eq!(out.geo_transform[1], -out.geo_transform[5]);
/// assert!(out.raster_size.0 > 0 && out.raster_size.1 > 0);
/// # Ok(())
/// # }
/// ```
pub fn suggested_warp_output(
    src: &Dataset,
    s_srs: &SpatialRef,
    t_srs: &SpatialRef,
) -> Result<SuggestedWarpOutput> {
    let transform = CoordTransform::new(s_srs, t_srs)?;
    suggested_warp_output_with_transform(src, &transform)
}

/// Like [`suggested_warp_output`], through an already created transformation.
pub fn suggested_warp_output_with_transform(
    src: &Dataset,
    transform: &CoordTransform,
) -> Result<SuggestedWarpOutput> {
    let gt = src.geo_transform()?;
    let (width, height) = src.raster_size();
    let (w, h) = (width as f64, height as f64);

    let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)].map(|(p, l)| gt.apply(p, l));
    let mut xs = corners.map(|c| c.0);
    let mut ys = corners.map(|c| c.1);
    transform.transform_coords(&mut xs, &mut ys, &mut [])?;
    let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut diag_x = [gt[0], gt[0] + gt[1] * w];
    let mut diag_y = [gt[3], gt[3] + gt[5] * h];
    transform.transform_coords(&mut diag_x, &mut diag_y, &mut [])?;
    let diagonal = (diag_x[1] - diag_x[0]).hypot(diag_y[1] - diag_y[0]);
    let res = diagonal / w.hypot(h);
    if !(res.is_finite() && res > 0.0) {
        return Err(RasterError::BadArgument(format!(
            "Cannot derive an output resolution from diagonal length {diagonal}"
        )));
    }

    let raster_size = (
        ((max_x - min_x) / res).ceil() as usize,
        ((max_y - min_y) / res).ceil() as usize,
    );
    let geo_transform = [min_x, res, gt[2], max_y, gt[4], -res];
    log::debug!("Suggested warp output {raster_size:?} with {geo_transform:?}");
    Ok(SuggestedWarpOutput {
        geo_transform,
        raster_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_near;
    use crate::spatial_ref::{TransformProvider, TransformRegistry};

    fn north_up(width: usize, height: usize, gt: GeoTransform) -> Dataset {
        let ds = Dataset::create_with_band_type::<u8>(width, height, 1).unwrap();
        ds.set_geo_transform(&gt).unwrap();
        ds
    }

    #[test]
    fn test_suggested_output_scale_rotation() -> Result<()> {
        let src = north_up(256, 256, [1000.0, 10.0, 0.0, 5000.0, 0.0, -10.0]);
        let a = SpatialRef::from_definition("+proj=test_a")?;
        let b = SpatialRef::from_definition("+proj=test_b")?;
        // 30 degree rotation, scaled by 2, shifted
        let (sin, cos) = 30f64.to_radians().sin_cos();
        let affine = [500.0, 2.0 * cos, -2.0 * sin, -300.0, 2.0 * sin, 2.0 * cos];
        let mut registry = TransformRegistry::new();
        registry.register_affine(&a, &b, affine)?;
        let transform = registry.create_transform(&a, &b)?;

        let out = suggested_warp_output_with_transform(&src, &transform)?;

        let map = |x: f64, y: f64| {
            (
                affine[0] + x * affine[1] + y * affine[2],
                affine[3] + x * affine[4] + y * affine[5],
            )
        };
        let corners = [
            map(1000.0, 5000.0),
            map(3560.0, 5000.0),
            map(3560.0, 2440.0),
            map(1000.0, 2440.0),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
        // distances scale by 2, so the diagonal keeps 256 * sqrt(2) pixels of 20 units
        let res = 20.0;

        assert_near!(out.geo_transform[0], min_x, epsilon = 1e-3);
        assert_near!(out.geo_transform[3], max_y, epsilon = 1e-3);
        assert_near!(out.geo_transform[1], res, epsilon = 1e-3);
        assert_near!(out.geo_transform[5], -res, epsilon = 1e-3);
        let expected_w = (max_x - min_x) / res;
        let expected_h = (max_y - min_y) / res;
        assert!((out.raster_size.0 as f64 - expected_w).abs() <= 1.0);
        assert!((out.raster_size.1 as f64 - expected_h).abs() <= 1.0);
        Ok(())
    }

    #[test]
    fn test_suggested_output_identity() -> Result<()> {
        let src = north_up(40, 30, [10.0, 0.5, 0.0, 20.0, 0.0, -0.5]);
        let srs = SpatialRef::from_epsg(4326)?;
        let out = suggested_warp_output(&src, &srs, &srs)?;
        assert_eq!(out.raster_size, (40, 30));
        assert_near!(out.geo_transform[1], 0.5, epsilon = 1e-12);
        assert_near!(out.geo_transform[0], 10.0, epsilon = 1e-12);
        assert_near!(out.geo_transform[3], 20.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_suggested_output_unknown_transform() {
        let src = north_up(4, 4, [0.0, 1.0, 0.0, 0.0, 0.0, -1.0]);
        let a = SpatialRef::from_definition("+proj=test_a").unwrap();
        let b = SpatialRef::from_definition("+proj=test_b").unwrap();
        let err = suggested_warp_output(&src, &a, &b).unwrap_err();
        assert!(matches!(err, RasterError::TransformError { .. }));
    }

    #[test]
    fn test_suggested_output_requires_geotransform() {
        let src = Dataset::create_with_band_type::<u8>(4, 4, 1).unwrap();
        let srs = SpatialRef::from_epsg(4326).unwrap();
        let err = suggested_warp_output(&src, &srs, &srs).unwrap_err();
        assert!(matches!(err, RasterError::NotARaster { .. }));
    }
}
