//! Spatial reference systems and the coordinate transformations between them.

#[cfg(feature = "proj")]
mod proj;
mod srs;
mod transform;

#[cfg(feature = "proj")]
pub use self::proj::ProjTransformProvider;
pub use srs::SpatialRef;
pub use transform::{CoordTransform, PointTransform, TransformProvider, TransformRegistry};

#[cfg(test)]
mod tests;
