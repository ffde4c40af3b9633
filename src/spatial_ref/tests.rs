use std::sync::Arc;

use geo_types::{polygon, Geometry};

use super::{CoordTransform, SpatialRef, TransformProvider, TransformRegistry};
use crate::assert_near;
use crate::errors::RasterError;

const WGS84_WKT: &str = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",7030]],TOWGS84[0,0,0,0,0,0,0],AUTHORITY[\"EPSG\",6326]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",8901]],UNIT[\"DMSH\",0.0174532925199433,AUTHORITY[\"EPSG\",9108]],AXIS[\"Lat\",NORTH],AXIS[\"Long\",EAST],AUTHORITY[\"EPSG\",4326]]";

#[test]
fn from_epsg_to_proj4() {
    let spatial_ref = SpatialRef::from_epsg(4326).unwrap();
    let proj4string = spatial_ref.to_proj4().unwrap();
    assert_eq!("+proj=longlat +datum=WGS84 +no_defs", proj4string.trim());
}

#[test]
fn comparison() {
    let spatial_ref1 = SpatialRef::from_wkt(WGS84_WKT).unwrap();
    let spatial_ref2 = SpatialRef::from_epsg(4326).unwrap();
    let spatial_ref3 = SpatialRef::from_epsg(3025).unwrap();
    let spatial_ref4 = SpatialRef::from_proj4("+proj=longlat +datum=WGS84 +no_defs ").unwrap();
    let spatial_ref5 = SpatialRef::from_proj4("+init=epsg:4326").unwrap();
    let spatial_ref6 = SpatialRef::from_definition("urn:ogc:def:crs:EPSG::4326").unwrap();

    assert!(spatial_ref1 == spatial_ref2);
    assert!(spatial_ref2 != spatial_ref3);
    assert!(spatial_ref4 == spatial_ref2);
    assert!(spatial_ref5 == spatial_ref4);
    assert!(spatial_ref6 == spatial_ref1);
}

#[test]
fn proj4_parameter_order_is_irrelevant() {
    let a = SpatialRef::from_proj4(
        "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +units=m +no_defs",
    )
    .unwrap();
    let b = SpatialRef::from_definition(
        "+units=m +ellps=GRS80 +proj=laea +lon_0=10 +lat_0=52 +y_0=3210000 +x_0=4321000",
    )
    .unwrap();
    assert_eq!(a, b);
    assert!(SpatialRef::from_proj4("proj=laea").is_err());
    assert!(SpatialRef::from_definition("not a crs").is_err());
}

#[test]
fn authority() {
    let spatial_ref = SpatialRef::from_epsg(4326).unwrap();
    assert_eq!(spatial_ref.auth_name().unwrap(), "EPSG".to_string());
    assert_eq!(spatial_ref.auth_code().unwrap(), 4326);
    assert_eq!(spatial_ref.authority().unwrap(), "EPSG:4326".to_string());
    let spatial_ref = SpatialRef::from_wkt(WGS84_WKT).unwrap();
    assert_eq!(spatial_ref.auth_name().unwrap(), "EPSG".to_string());
    assert_eq!(spatial_ref.auth_code().unwrap(), 4326);
    assert_eq!(spatial_ref.authority().unwrap(), "EPSG:4326".to_string());
    let spatial_ref = SpatialRef::from_wkt("GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",7030]],TOWGS84[0,0,0,0,0,0,0],AUTHORITY[\"EPSG\",6326]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",8901]],UNIT[\"DMSH\",0.0174532925199433,AUTHORITY[\"EPSG\",9108]],AXIS[\"Lat\",NORTH],AXIS[\"Long\",EAST]]").unwrap();
    assert!(spatial_ref.auth_name().is_err());
    assert!(spatial_ref.auth_code().is_err());
    assert!(spatial_ref.authority().is_err());
    let spatial_ref = SpatialRef::from_proj4(
        "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +units=m +no_defs",
    )
    .unwrap();
    assert!(spatial_ref.auth_name().is_err());
    assert!(spatial_ref.auth_code().is_err());
    assert!(spatial_ref.authority().is_err());
}

#[test]
fn web_mercator_round_trip() {
    let wgs84 = SpatialRef::from_epsg(4326).unwrap();
    let webmercator = SpatialRef::from_epsg(3857).unwrap();

    let forward = CoordTransform::new(&wgs84, &webmercator).unwrap();
    let mut xs = [0.0, 180.0, 13.4];
    let mut ys = [0.0, 0.0, 52.5];
    forward.transform_coords(&mut xs, &mut ys, &mut []).unwrap();
    assert_near!(xs[0], 0.0, epsilon = 1e-9);
    assert_near!(ys[0], 0.0, epsilon = 1e-9);
    assert_near!(xs[1], 20037508.342789244, epsilon = 1e-6);
    assert_near!(xs[2], 1491681.1766, epsilon = 1e-3);
    assert_near!(ys[2], 6891041.7239, epsilon = 1e-3);

    let inverse = CoordTransform::new(&webmercator, &wgs84).unwrap();
    let (lon, lat) = inverse.transform_point(xs[2], ys[2]).unwrap();
    assert_near!(lon, 13.4, epsilon = 1e-9);
    assert_near!(lat, 52.5, epsilon = 1e-9);
}

#[test]
fn failing_transformation() {
    let wgs84 = SpatialRef::from_epsg(4326).unwrap();
    let webmercator = SpatialRef::from_epsg(3857).unwrap();

    let mut x = [1000000.0];
    let mut y = [1000000.0];

    let trafo = CoordTransform::new(&wgs84, &webmercator).unwrap();
    let r = trafo.transform_coords(&mut x, &mut y, &mut []);

    assert!(r.is_err());
    if let RasterError::InvalidCoordinateRange { from, to, .. } = r.unwrap_err() {
        assert_eq!(from, "EPSG:4326");
        assert_eq!(to, "EPSG:3857");
    } else {
        panic!("Wrong error type");
    }

    let dhd_2 = SpatialRef::from_epsg(31462).unwrap();
    let r = CoordTransform::new(&wgs84, &dhd_2);
    assert!(matches!(r, Err(RasterError::TransformError { .. })));
}

#[test]
fn registry_affine_pairs() {
    let a = SpatialRef::from_epsg(32632).unwrap();
    let b = SpatialRef::from_epsg(25832).unwrap();
    let mut registry = TransformRegistry::new();
    registry
        .register_affine(&a, &b, [10.0, 2.0, 0.0, -5.0, 0.0, 2.0])
        .unwrap();

    let forward = registry.create_transform(&a, &b).unwrap();
    let inverse = registry.create_transform(&b, &a).unwrap();
    let (x, y) = forward.transform_point(1.0, 1.0).unwrap();
    assert_eq!((x, y), (12.0, -3.0));
    let (x, y) = inverse.transform_point(x, y).unwrap();
    assert_near!(x, 1.0, epsilon = 1e-12);
    assert_near!(y, 1.0, epsilon = 1e-12);

    let same = registry.create_transform(&a, &a).unwrap();
    assert_eq!(same.transform_point(3.0, 4.0).unwrap(), (3.0, 4.0));
}

#[test]
fn registry_closures() {
    let a = SpatialRef::from_definition("+proj=test_a").unwrap();
    let b = SpatialRef::from_definition("+proj=test_b").unwrap();
    let mut registry = TransformRegistry::new();
    registry.register_fn(&a, &b, |x, y| (x >= 0.0).then_some((x.sqrt(), y)));

    let t = registry.create_transform(&a, &b).unwrap();
    assert_eq!(t.transform_point(9.0, 1.0).unwrap(), (3.0, 1.0));
    assert!(t.transform_point(-1.0, 1.0).is_err());

    // no inverse for closures
    assert!(registry.create_transform(&b, &a).is_err());
}

#[test]
fn transform_geometry() {
    let t = CoordTransform::from_point_transform("a", "b", Arc::new(|x: f64, y: f64| Some((x * 2.0, y + 1.0))));
    let geom: Geometry<f64> = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into();
    let out = t.transform_geometry(&geom).unwrap();
    let expected: Geometry<f64> = polygon![(x: 0.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0)].into();
    assert_eq!(out, expected);
}
