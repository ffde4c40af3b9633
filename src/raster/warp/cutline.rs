use geo::{Contains, EuclideanDistance};
use geo_types::{Geometry, LineString, MultiPolygon, Point};

use crate::errors::{RasterError, Result};

/// A polygonal clip mask in source pixel/line coordinates.
pub(crate) struct Cutline {
    polygons: MultiPolygon<f64>,
    rings: Vec<LineString<f64>>,
    blend_distance: f64,
}

impl Cutline {
    pub fn new(geometry: &Geometry<f64>, blend_distance: f64) -> Result<Self> {
        let polygons = match geometry {
            Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
            Geometry::MultiPolygon(mp) => mp.clone(),
            other => {
                return Err(RasterError::InvalidCutlineType(format!("{other:?}")));
            }
        };
        let rings = polygons
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .cloned()
            .collect();
        Ok(Cutline {
            polygons,
            rings,
            blend_distance: blend_distance.max(0.0),
        })
    }

    /// Weight in `[0, 1]` of a source point: `1` well inside, `0` outside, and a linear
    /// ramp through `0.5` on the boundary within the blend distance.
    pub fn coverage(&self, x: f64, y: f64) -> f64 {
        let point = Point::new(x, y);
        let inside = self.polygons.contains(&point);
        if self.blend_distance == 0.0 {
            return if inside { 1.0 } else { 0.0 };
        }
        let distance = self
            .rings
            .iter()
            .map(|ring| point.euclidean_distance(ring))
            .fold(f64::INFINITY, f64::min);
        if distance >= self.blend_distance {
            return if inside { 1.0 } else { 0.0 };
        }
        let ramp = 0.5 * distance / self.blend_distance;
        if inside {
            0.5 + ramp
        } else {
            0.5 - ramp
        }
    }
}
