//! PROJ backed transformations, enabled with the `proj` feature.

use std::sync::{Arc, Mutex};

use proj::Proj;

use crate::errors::{RasterError, Result};
use crate::spatial_ref::{CoordTransform, PointTransform, SpatialRef, TransformProvider};

struct ProjPoints(Mutex<Proj>);

impl PointTransform for ProjPoints {
    fn transform_xy(&self, x: &mut [f64], y: &mut [f64]) {
        let Ok(proj) = self.0.lock() else {
            x.fill(f64::NAN);
            y.fill(f64::NAN);
            return;
        };
        for (px, py) in x.iter_mut().zip(y.iter_mut()) {
            match proj.convert((*px, *py)) {
                Ok((tx, ty)) if tx.is_finite() && ty.is_finite() => {
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

/// [`TransformProvider`] handing every pair to the PROJ library.
///
/// Axis order is normalized for visualization, so geographic systems are longitude first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjTransformProvider;

impl TransformProvider for ProjTransformProvider {
    fn create_transform(&self, source: &SpatialRef, target: &SpatialRef) -> Result<CoordTransform> {
        let proj = Proj::new_known_crs(source.definition(), target.definition(), None).map_err(
            |e| RasterError::TransformError {
                from: source.to_string(),
                to: target.to_string(),
                msg: e.to_string(),
            },
        )?;
        log::debug!("Created PROJ transformation {source} -> {target}");
        Ok(CoordTransform::from_point_transform(
            source.to_string(),
            target.to_string(),
            Arc::new(ProjPoints(Mutex::new(proj))),
        ))
    }
}
