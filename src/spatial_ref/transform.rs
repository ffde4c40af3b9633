use std::f64::consts::FRAC_PI_4;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use geo::MapCoords;
use geo_types::{Coord, Geometry};

use crate::errors;
use crate::errors::RasterError;
use crate::spatial_ref::SpatialRef;
use crate::{GeoTransform, GeoTransformEx};

/// Radius of the sphere used by web mercator.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Point-wise coordinate math behind a [`CoordTransform`].
///
/// Implementations transform `x`/`y` in place and write `NaN` to both
/// coordinates of any point they cannot transform.
pub trait PointTransform: Send + Sync {
    fn transform_xy(&self, x: &mut [f64], y: &mut [f64]);
}

impl<F> PointTransform for F
where
    F: Fn(f64, f64) -> Option<(f64, f64)> + Send + Sync,
{
    fn transform_xy(&self, x: &mut [f64], y: &mut [f64]) {
        for (px, py) in x.iter_mut().zip(y.iter_mut()) {
            match self(*px, *py) {
                Some((tx, ty)) if tx.is_finite() && ty.is_finite() => {
                    *px = tx;
                    *py = ty;
                }
                _ => {
                    *px = f64::NAN;
                    *py = f64::NAN;
                }
            }
        }
    }
}

struct Affine(GeoTransform);

impl PointTransform for Affine {
    fn transform_xy(&self, x: &mut [f64], y: &mut [f64]) {
        for (px, py) in x.iter_mut().zip(y.iter_mut()) {
            (*px, *py) = self.0.apply(*px, *py);
        }
    }
}

struct Identity;

impl PointTransform for Identity {
    fn transform_xy(&self, _x: &mut [f64], _y: &mut [f64]) {}
}

/// Longitude/latitude degrees to spherical web mercator metres.
fn lon_lat_to_mercator(lon: f64, lat: f64) -> Option<(f64, f64)> {
    if !(-90.0..=90.0).contains(&lat) || lat.abs() == 90.0 {
        return None;
    }
    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Some((x, y))
}

fn mercator_to_lon_lat(x: f64, y: f64) -> Option<(f64, f64)> {
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Some((lon, lat))
}

#[derive(Clone)]
/// Defines a coordinate transformation from one [`SpatialRef`] to another.
///
/// Geographic systems use traditional GIS axis order: `x` is longitude, `y` latitude.
pub struct CoordTransform {
    inner: Arc<dyn PointTransform>,
    from: String,
    to: String,
}

impl Debug for CoordTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordTransform")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl CoordTransform {
    /// Constructs a new transformation from `source` to `target` using the built-in
    /// [`TransformRegistry`].
    pub fn new(source: &SpatialRef, target: &SpatialRef) -> errors::Result<CoordTransform> {
        TransformRegistry::default().create_transform(source, target)
    }

    /// Wrap arbitrary point math. `from` and `to` label the systems in error messages.
    pub fn from_point_transform(
        from: impl Into<String>,
        to: impl Into<String>,
        op: Arc<dyn PointTransform>,
    ) -> CoordTransform {
        CoordTransform {
            inner: op,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Transformation applying an affine [`GeoTransform`] to every point.
    ///
    /// Passing the inverse of a dataset's geotransform yields a transformation into
    /// that dataset's pixel/line space, which is how warp cutlines are expressed.
    pub fn from_geo_transform(
        from: impl Into<String>,
        to: impl Into<String>,
        geo_transform: GeoTransform,
    ) -> CoordTransform {
        Self::from_point_transform(from, to, Arc::new(Affine(geo_transform)))
    }

    pub fn identity(srs: &SpatialRef) -> CoordTransform {
        Self::from_point_transform(srs.to_string(), srs.to_string(), Arc::new(Identity))
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    /// Transform in place, marking points that fail with `NaN` instead of failing the batch.
    pub(crate) fn transform_partial(&self, x: &mut [f64], y: &mut [f64]) {
        self.inner.transform_xy(x, y);
    }

    /// Transform coordinates in place.
    ///
    /// # Arguments
    /// * `x` - slice of x coordinates
    /// * `y` - slice of y coordinates (must match x in length)
    /// * `z` - slice of z coordinates, or an empty slice to ignore. Heights pass through unchanged.
    pub fn transform_coords(
        &self,
        x: &mut [f64],
        y: &mut [f64],
        z: &mut [f64],
    ) -> errors::Result<()> {
        let nb_coords = x.len();
        if nb_coords != y.len() || (!z.is_empty() && nb_coords != z.len()) {
            return Err(RasterError::BadArgument(format!(
                "transform coordinate slices have different lengths: {} != {}",
                nb_coords,
                y.len()
            )));
        }
        self.transform_partial(x, y);

        match x.iter().zip(y.iter()).position(|(a, b)| a.is_nan() || b.is_nan()) {
            None => Ok(()),
            Some(idx) => Err(RasterError::InvalidCoordinateRange {
                from: self.from.clone(),
                to: self.to.clone(),
                msg: Some(format!("point {idx} could not be transformed")),
            }),
        }
    }

    pub fn transform_point(&self, x: f64, y: f64) -> errors::Result<(f64, f64)> {
        let (mut xs, mut ys) = ([x], [y]);
        self.transform_coords(&mut xs, &mut ys, &mut [])?;
        Ok((xs[0], ys[0]))
    }

    /// Transform every vertex of `geometry`.
    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> errors::Result<Geometry<f64>> {
        geometry.try_map_coords(|c: Coord<f64>| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}

/// Source of [`CoordTransform`]s between pairs of spatial references.
pub trait TransformProvider: Debug + Send + Sync {
    /// Fails with [`RasterError::TransformError`] when no transformation exists.
    fn create_transform(
        &self,
        source: &SpatialRef,
        target: &SpatialRef,
    ) -> errors::Result<CoordTransform>;
}

/// Default [`TransformProvider`].
///
/// Knows the identity, `EPSG:4326 <-> EPSG:3857`, and any pair registered on it.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    pairs: Vec<(SpatialRef, SpatialRef, Arc<dyn PointTransform>)>,
}

impl Debug for TransformRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.pairs.iter().map(|(s, t, _)| format!("{s} -> {t}")))
            .finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Register an affine mapping from `source` to `target`; the inverse is registered too.
    pub fn register_affine(
        &mut self,
        source: &SpatialRef,
        target: &SpatialRef,
        geo_transform: GeoTransform,
    ) -> errors::Result<&mut Self> {
        let inverse = geo_transform.invert()?;
        self.register(source, target, Arc::new(Affine(geo_transform)));
        self.register(target, source, Arc::new(Affine(inverse)));
        Ok(self)
    }

    /// Register point math for `source -> target`. Return `None` for points outside its domain.
    pub fn register_fn<F>(&mut self, source: &SpatialRef, target: &SpatialRef, f: F) -> &mut Self
    where
        F: Fn(f64, f64) -> Option<(f64, f64)> + Send + Sync + 'static,
    {
        self.register(source, target, Arc::new(f));
        self
    }

    /// Later registrations replace earlier ones for the same pair.
    pub fn register(&mut self, source: &SpatialRef, target: &SpatialRef, op: Arc<dyn PointTransform>) {
        self.pairs.retain(|(s, t, _)| !(s == source && t == target));
        self.pairs.push((source.clone(), target.clone(), op));
    }
}

impl TransformProvider for TransformRegistry {
    fn create_transform(
        &self,
        source: &SpatialRef,
        target: &SpatialRef,
    ) -> errors::Result<CoordTransform> {
        let label = |srs: &SpatialRef| srs.to_string();
        if let Some((_, _, op)) = self
            .pairs
            .iter()
            .find(|(s, t, _)| s == source && t == target)
        {
            return Ok(CoordTransform::from_point_transform(
                label(source),
                label(target),
                op.clone(),
            ));
        }
        if source == target {
            return Ok(CoordTransform::identity(source));
        }
        let op: Arc<dyn PointTransform> = match (source.auth_code().ok(), target.auth_code().ok()) {
            (Some(4326), Some(3857)) => Arc::new(lon_lat_to_mercator),
            (Some(3857), Some(4326)) => Arc::new(mercator_to_lon_lat),
            _ => {
                return Err(RasterError::TransformError {
                    from: label(source),
                    to: label(target),
                    msg: "no transformation registered for this pair".to_string(),
                })
            }
        };
        Ok(CoordTransform::from_point_transform(
            label(source),
            label(target),
            op,
        ))
    }
}
