use crate::raster::{Buffer, DataType};
use crate::{Dataset, GeoTransform};

/// North-up geotransform with unit pixels and the origin at the bottom left corner.
pub fn unit_geo_transform(height: usize) -> GeoTransform {
    [0.0, 1.0, 0.0, height as f64, 0.0, -1.0]
}

/// Value of the test pattern at `(x, y)` in band `band` (1-based).
pub fn pattern(x: usize, y: usize, band: usize) -> u8 {
    ((x * 7 + y * 13 + band * 31) % 251) as u8
}

/// A georeferenced dataset of `band_count` bands of `data_type` filled with [`pattern`].
pub fn patterned_dataset(
    width: usize,
    height: usize,
    band_count: usize,
    data_type: DataType,
) -> Dataset {
    let ds = Dataset::create(width, height, band_count, data_type).unwrap();
    ds.set_geo_transform(&unit_geo_transform(height)).unwrap();
    for b in 1..=band_count {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| pattern(x, y, b)))
            .collect();
        let buffer = Buffer::new((width, height), data);
        ds.rasterband(b)
            .unwrap()
            .write((0, 0), (width, height), &buffer)
            .unwrap();
    }
    ds
}

/// Assert numerical difference between two expressions is less than
/// 64-bit machine epsilon or a specified epsilon.
///
/// # Examples:
/// ```rust, no_run
/// use georaster::assert_near;
/// use std::f64::consts::{PI, E};
/// assert_near!(PI / E, 1.1557273497909217);
/// // with specified epsilon
/// assert_near!(PI / E, 1.15572734, epsilon = 1e-8);
/// ```
#[macro_export]
macro_rules! assert_near {
    ($left:expr, $right:expr) => {
        $crate::assert_near!($left, $right, epsilon = f64::EPSILON)
    };
    ($left:expr, $right:expr, epsilon = $ep:expr) => {
        assert!(
            ($left - $right).abs() < $ep,
            "|{} - {}| = {} is greater than epsilon {:.4e}",
            $left,
            $right,
            ($left - $right).abs(),
            $ep
        )
    };
    ($left:expr, $right:expr, epsilon = $ep:expr, field = $field:expr) => {
        assert!(
            ($left - $right).abs() < $ep,
            "field {}: |{} - {}| = {} is greater than epsilon {:.4e}",
            $field,
            $left,
            $right,
            ($left - $right).abs(),
            $ep
        )
    };
}
