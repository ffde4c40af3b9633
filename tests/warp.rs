use std::sync::Arc;

use geo_types::{line_string, polygon, Geometry};
use georaster::errors::{RasterError, Result};
use georaster::raster::warp::{
    reproject_image, suggested_warp_output, InitValue, NumThreads, ReprojectOptions,
    WarpResampleAlg,
};
use georaster::raster::{checksum_image, Buffer};
use georaster::spatial_ref::{SpatialRef, TransformRegistry};
use georaster::Dataset;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pattern(x: usize, y: usize) -> u8 {
    ((x * 7 + y * 13) % 251) as u8
}

/// `band_count` bands of [`pattern`] shifted by the band number, unit pixels, north up.
fn patterned(width: usize, height: usize, band_count: usize) -> Dataset {
    let ds = Dataset::create_with_band_type::<u8>(width, height, band_count).unwrap();
    ds.set_geo_transform(&[0.0, 1.0, 0.0, height as f64, 0.0, -1.0])
        .unwrap();
    for b in 1..=band_count {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| pattern(x, y).wrapping_add(b as u8)))
            .collect();
        ds.rasterband(b)
            .unwrap()
            .write((0, 0), (width, height), &Buffer::new((width, height), data))
            .unwrap();
    }
    ds
}

fn band_data(ds: &Dataset, band: usize) -> Vec<u8> {
    ds.rasterband(band).unwrap().read_band_as::<u8>().unwrap().data
}

fn checksum(ds: &Dataset, band: usize) -> u16 {
    checksum_image(&ds.rasterband(band).unwrap(), None).unwrap()
}

#[test]
fn test_identity_copies_pixels() -> Result<()> {
    init_logger();
    let src = patterned(16, 12, 2);
    let mut dst = Dataset::create_with_band_type::<u8>(16, 12, 2)?;
    dst.set_geo_transform(&src.geo_transform()?)?;

    reproject_image(&src, &mut dst, &ReprojectOptions::new())?;

    assert_eq!(band_data(&dst, 1), band_data(&src, 1));
    assert_eq!(band_data(&dst, 2), band_data(&src, 2));
    assert_eq!(checksum(&dst, 1), checksum(&src, 1));
    Ok(())
}

#[test]
fn test_average_downsampling() -> Result<()> {
    init_logger();
    let src = patterned(8, 8, 1);
    let mut dst = Dataset::create_with_band_type::<f32>(4, 4, 1)?;
    dst.set_geo_transform(&[0.0, 2.0, 0.0, 8.0, 0.0, -2.0])?;

    let mut opts = ReprojectOptions::new();
    opts.warp_options_mut()
        .with_resampling_alg(WarpResampleAlg::Average);
    reproject_image(&src, &mut dst, &opts)?;

    let source = band_data(&src, 1);
    let result = dst.rasterband(1)?.read_band_as::<f32>()?;
    for j in 0..4 {
        for i in 0..4 {
            let sum: u32 = [(0, 0), (1, 0), (0, 1), (1, 1)]
                .iter()
                .map(|(dx, dy)| source[(2 * j + dy) * 8 + 2 * i + dx] as u32)
                .sum();
            assert_eq!(result.data[j * 4 + i], sum as f32 / 4.0, "pixel ({i}, {j})");
        }
    }
    Ok(())
}

#[test]
fn test_multi_threaded_matches_single() -> Result<()> {
    init_logger();
    let src = patterned(97, 83, 2);
    let algs = [
        WarpResampleAlg::NearestNeighbour,
        WarpResampleAlg::Bilinear,
        WarpResampleAlg::Cubic,
        WarpResampleAlg::Lanczos,
        WarpResampleAlg::Average,
        WarpResampleAlg::Mode,
    ];
    for alg in algs {
        let mut results = Vec::new();
        for multi in [false, true] {
            let mut dst = Dataset::create_with_band_type::<u8>(90, 70, 3)?;
            dst.set_geo_transform(&[3.3, 0.9, 0.0, 80.0, 0.0, -1.1])?;
            let mut opts = ReprojectOptions::new();
            opts.warp_options_mut()
                .with_resampling_alg(alg)
                .with_memory_limit(100_000)
                .with_src_bands(&[1, 2])
                .with_dst_bands(&[1, 2])
                .with_dst_alpha_band(3)
                .with_multi(multi)
                .with_num_threads(NumThreads::Count(4));
            reproject_image(&src, &mut dst, &opts)?;
            results.push(dst);
        }
        for band in 1..=3 {
            assert_eq!(
                checksum(&results[0], band),
                checksum(&results[1], band),
                "{alg} band {band}"
            );
            assert_eq!(band_data(&results[0], band), band_data(&results[1], band));
        }
        assert!(band_data(&results[0], 1).iter().any(|v| *v != 0), "{alg}");
    }
    Ok(())
}

#[test]
fn test_approximate_transform_differs_from_exact() -> Result<()> {
    init_logger();
    let src_srs = SpatialRef::from_proj4("+proj=test_src")?;
    let dst_srs = SpatialRef::from_proj4("+proj=test_dst")?;
    let mut registry = TransformRegistry::new();
    // destination to source, stretching [0, 200] onto itself unevenly
    registry.register_fn(&dst_srs, &src_srs, |x, y| {
        Some((0.6 * x + 0.002 * x * x, y))
    });
    let registry = Arc::new(registry);

    let src = patterned(200, 50, 1);
    src.set_spatial_ref(&src_srs)?;

    let mut checksums = Vec::new();
    let mut outputs = Vec::new();
    for max_error in [0.0, 0.5] {
        let mut dst = Dataset::create_with_band_type::<u8>(200, 50, 1)?;
        dst.set_geo_transform(&src.geo_transform()?)?;
        dst.set_spatial_ref(&dst_srs)?;
        let mut opts = ReprojectOptions::new();
        opts.with_max_error(max_error)
            .with_transform_provider(registry.clone());
        reproject_image(&src, &mut dst, &opts)?;
        checksums.push(checksum(&dst, 1));
        outputs.push(dst);
    }

    // exact: column 100 maps to 0.6 * 100.5 + 0.002 * 100.5^2 = 80.5005
    assert_eq!(
        outputs[0].rasterband(1)?.get_pixel(100, 7)?,
        pattern(80, 7).wrapping_add(1) as f64
    );
    assert_ne!(checksums[0], checksums[1]);
    assert_ne!(band_data(&outputs[0], 1), band_data(&outputs[1], 1));
    Ok(())
}

#[test]
fn test_validation_happens_before_any_pixel() {
    init_logger();
    let src = patterned(10, 10, 2);
    let prepared = || {
        let dst = Dataset::create_with_band_type::<u8>(10, 10, 2).unwrap();
        dst.set_geo_transform(&src.geo_transform().unwrap())
            .unwrap();
        for b in 1..=2 {
            dst.rasterband(b).unwrap().fill(9.0).unwrap();
        }
        dst
    };
    let base = || {
        let mut opts = ReprojectOptions::new();
        opts.warp_options_mut()
            .with_initial_value(InitValue::Value(0.0));
        opts
    };

    let mut cases: Vec<(ReprojectOptions, fn(&RasterError) -> bool)> = Vec::new();

    let mut opts = base();
    opts.warp_options_mut().with_src_bands(&[1]);
    cases.push((opts, |e| matches!(e, RasterError::PairedOptionMissing(_))));

    let mut opts = base();
    opts.warp_options_mut()
        .with_src_bands(&[1, 2])
        .with_dst_bands(&[1]);
    cases.push((opts, |e| matches!(e, RasterError::PairedOptionMissing(_))));

    let mut opts = base();
    opts.warp_options_mut()
        .with_src_bands(&[3])
        .with_dst_bands(&[1]);
    cases.push((opts, |e| {
        matches!(e, RasterError::BandOutOfRange { index: 3, count: 2, .. })
    }));

    let mut opts = base();
    opts.warp_options_mut()
        .with_src_bands(&[1])
        .with_dst_bands(&[0]);
    cases.push((opts, |e| matches!(e, RasterError::BandOutOfRange { index: 0, .. })));

    let mut opts = base();
    opts.warp_options_mut().with_dst_alpha_band(5);
    cases.push((opts, |e| matches!(e, RasterError::BandOutOfRange { index: 5, .. })));

    let mut opts = base();
    opts.warp_options_mut().with_cutline(Geometry::LineString(line_string![
        (x: 0.0, y: 0.0),
        (x: 5.0, y: 5.0),
    ]));
    cases.push((opts, |e| matches!(e, RasterError::InvalidCutlineType(_))));

    let mut opts = base();
    opts.warp_options_mut().with_memory_limit(1000);
    cases.push((opts, |e| matches!(e, RasterError::MemoryLimitTooSmall { .. })));

    let mut opts = base();
    opts.with_src_spatial_ref(SpatialRef::from_proj4("+proj=test_a").unwrap())
        .with_dst_spatial_ref(SpatialRef::from_proj4("+proj=test_b").unwrap());
    cases.push((opts, |e| matches!(e, RasterError::TransformError { .. })));

    for (opts, expected) in cases {
        let mut dst = prepared();
        let err = reproject_image(&src, &mut dst, &opts).unwrap_err();
        assert!(expected(&err), "unexpected error {err:?}");
        assert!(band_data(&dst, 1).iter().all(|v| *v == 9), "{err:?}");
        assert!(band_data(&dst, 2).iter().all(|v| *v == 9), "{err:?}");
    }

    // datasets that cannot take part in a warp
    let mut no_geotransform = Dataset::create_with_band_type::<u8>(10, 10, 1).unwrap();
    assert!(matches!(
        reproject_image(&src, &mut no_geotransform, &base()),
        Err(RasterError::NotARaster { .. })
    ));
    let mut dst = prepared();
    assert!(matches!(
        reproject_image(&Dataset::create_vector(), &mut dst, &base()),
        Err(RasterError::NotARaster { .. })
    ));
    let closed = patterned(10, 10, 1);
    closed.close().unwrap();
    assert_eq!(
        reproject_image(&closed, &mut dst, &base()).unwrap_err(),
        RasterError::ClosedResource { what: "Dataset" }
    );
    let mut read_only = dst.to_read_only().unwrap();
    assert_eq!(
        reproject_image(&src, &mut read_only, &base()).unwrap_err(),
        RasterError::ReadOnly
    );
    assert!(band_data(&dst, 1).iter().all(|v| *v == 9));
}

#[test]
fn test_cutline_with_alpha() -> Result<()> {
    init_logger();
    let src = Dataset::create_with_band_type::<u8>(20, 20, 1)?;
    src.set_geo_transform(&[0.0, 1.0, 0.0, 20.0, 0.0, -1.0])?;
    src.rasterband(1)?.fill(100.0)?;

    let mut dst = Dataset::create_with_band_type::<u8>(20, 20, 2)?;
    dst.set_geo_transform(&src.geo_transform()?)?;

    // source pixel/line coordinates: the left half
    let cutline = polygon![
        (x: 0.0, y: 0.0),
        (x: 10.0, y: 0.0),
        (x: 10.0, y: 20.0),
        (x: 0.0, y: 20.0),
    ];
    let mut opts = ReprojectOptions::new();
    opts.warp_options_mut()
        .with_src_bands(&[1])
        .with_dst_bands(&[1])
        .with_dst_alpha_band(2)
        .with_cutline(cutline.into());
    reproject_image(&src, &mut dst, &opts)?;

    let values = band_data(&dst, 1);
    let alpha = band_data(&dst, 2);
    for y in 0..20 {
        for x in 0..20 {
            let i = y * 20 + x;
            if x < 10 {
                assert_eq!((values[i], alpha[i]), (100, 255), "({x}, {y})");
            } else {
                assert_eq!((values[i], alpha[i]), (0, 0), "({x}, {y})");
            }
        }
    }
    Ok(())
}

#[test]
fn test_blended_cutline_is_partial() -> Result<()> {
    init_logger();
    let src = Dataset::create_with_band_type::<f32>(20, 1, 1)?;
    src.set_geo_transform(&[0.0, 1.0, 0.0, 1.0, 0.0, -1.0])?;
    src.rasterband(1)?.fill(100.0)?;
    let mut dst = Dataset::create_with_band_type::<f32>(20, 1, 1)?;
    dst.set_geo_transform(&src.geo_transform()?)?;

    let mut opts = ReprojectOptions::new();
    opts.warp_options_mut()
        .with_cutline(
            polygon![
                (x: -5.0, y: -5.0),
                (x: 10.0, y: -5.0),
                (x: 10.0, y: 5.0),
                (x: -5.0, y: 5.0),
            ]
            .into(),
        )
        .extra_options_mut()
        .set_name_value("CUTLINE_BLEND_DIST", "4")?;
    reproject_image(&src, &mut dst, &opts)?;

    let values = dst.rasterband(1)?.read_band_as::<f32>()?.data;
    assert_eq!(values[0], 100.0);
    // 0.5 from the edge inside, 0.5 outside
    assert!((values[9] - 100.0 * (0.5 + 0.5 * 0.5 / 4.0)).abs() < 1e-3);
    assert!((values[10] - 100.0 * (0.5 - 0.5 * 0.5 / 4.0)).abs() < 1e-3);
    assert_eq!(values[19], 0.0);
    Ok(())
}

#[test]
fn test_init_dest_nodata() -> Result<()> {
    init_logger();
    let src = Dataset::create_with_band_type::<u8>(4, 4, 1)?;
    src.set_geo_transform(&[0.0, 1.0, 0.0, 4.0, 0.0, -1.0])?;
    src.rasterband(1)?.fill(10.0)?;

    let mut dst = Dataset::create_with_band_type::<u8>(8, 8, 1)?;
    dst.set_geo_transform(&[-2.0, 1.0, 0.0, 6.0, 0.0, -1.0])?;
    dst.rasterband(1)?.fill(3.0)?;

    let mut opts = ReprojectOptions::new();
    opts.with_dst_nodata(255.0)
        .warp_options_mut()
        .with_initial_value(InitValue::NoData)
        .with_resampling_alg(WarpResampleAlg::NearestNeighbour);
    reproject_image(&src, &mut dst, &opts)?;

    let band = dst.rasterband(1)?;
    assert_eq!(band.no_data_value()?, Some(255.0));
    let data = band.read_band_as::<u8>()?.data;
    for y in 0..8 {
        for x in 0..8 {
            let inside = (2..6).contains(&x) && (2..6).contains(&y);
            let expected = if inside { 10 } else { 255 };
            assert_eq!(data[y * 8 + x], expected, "({x}, {y})");
        }
    }
    Ok(())
}

#[test]
fn test_source_nodata_is_skipped() -> Result<()> {
    init_logger();
    let src = Dataset::create_with_band_type::<u8>(6, 6, 1)?;
    src.set_geo_transform(&[0.0, 1.0, 0.0, 6.0, 0.0, -1.0])?;
    let mut band = src.rasterband(1)?;
    band.fill(50.0)?;
    band.set_pixel(3, 3, 0.0)?;
    band.set_no_data_value(Some(0.0))?;

    let mut dst = Dataset::create_with_band_type::<u8>(6, 6, 1)?;
    dst.set_geo_transform(&src.geo_transform()?)?;
    let mut opts = ReprojectOptions::new();
    opts.warp_options_mut()
        .extra_options_mut()
        .set_name_value("INIT_DEST", "7")?;
    reproject_image(&src, &mut dst, &opts)?;

    let out = dst.rasterband(1)?;
    assert_eq!(out.get_pixel(3, 3)?, 7.0);
    assert_eq!(out.get_pixel(2, 3)?, 50.0);

    // an explicit source nodata overrides the band's
    let mut dst = Dataset::create_with_band_type::<u8>(6, 6, 1)?;
    dst.set_geo_transform(&src.geo_transform()?)?;
    dst.rasterband(1)?.fill(9.0)?;
    let mut opts = ReprojectOptions::new();
    opts.with_src_nodata(50.0);
    reproject_image(&src, &mut dst, &opts)?;
    let out = dst.rasterband(1)?;
    assert_eq!(out.get_pixel(3, 3)?, 0.0);
    assert_eq!(out.get_pixel(2, 3)?, 9.0);
    Ok(())
}

#[test]
fn test_band_mapping() -> Result<()> {
    init_logger();
    let src = patterned(9, 7, 3);
    let mut dst = Dataset::create_with_band_type::<u8>(9, 7, 2)?;
    dst.set_geo_transform(&src.geo_transform()?)?;

    let mut opts = ReprojectOptions::new();
    opts.warp_options_mut()
        .with_src_bands(&[3, 1])
        .with_dst_bands(&[1, 2]);
    reproject_image(&src, &mut dst, &opts)?;

    assert_eq!(band_data(&dst, 1), band_data(&src, 3));
    assert_eq!(band_data(&dst, 2), band_data(&src, 1));
    Ok(())
}

#[test]
fn test_geographic_to_web_mercator() -> Result<()> {
    init_logger();
    let wgs84 = SpatialRef::from_epsg(4326)?;
    let mercator = SpatialRef::from_epsg(3857)?;
    let src = Dataset::create_with_band_type::<u8>(40, 40, 1)?;
    src.set_geo_transform(&[0.0, 0.5, 0.0, 60.0, 0.0, -0.5])?;
    src.set_spatial_ref(&wgs84)?;
    src.rasterband(1)?.fill(77.0)?;

    let plan = suggested_warp_output(&src, &wgs84, &mercator)?;
    let (width, height) = plan.raster_size;
    let mut dst = Dataset::create_with_band_type::<u8>(width, height, 1)?;
    dst.set_geo_transform(&plan.geo_transform)?;
    dst.set_spatial_ref(&mercator)?;

    let mut opts = ReprojectOptions::new();
    opts.with_max_error(0.125)
        .warp_options_mut()
        .with_resampling_alg(WarpResampleAlg::Bilinear)
        .with_multi(true);
    reproject_image(&src, &mut dst, &opts)?;

    let data = band_data(&dst, 1);
    let covered = data.iter().filter(|v| **v == 77).count();
    assert!(covered * 10 >= data.len() * 9, "{covered} of {}", data.len());
    assert_eq!(data[(height / 2) * width + width / 2], 77);
    Ok(())
}

#[test]
fn test_area_kernels_follow_local_scale() -> Result<()> {
    init_logger();
    let src_srs = SpatialRef::from_proj4("+proj=test_src")?;
    let dst_srs = SpatialRef::from_proj4("+proj=test_dst")?;
    let mut registry = TransformRegistry::new();
    // destination to source, one destination pixel at column c spans (2c + 1) / 10 source pixels
    registry.register_fn(&dst_srs, &src_srs, |x, y| Some((x * x / 10.0, y)));
    let registry = Arc::new(registry);

    let src = Dataset::create_with_band_type::<u8>(40, 1, 1)?;
    src.set_geo_transform(&[0.0, 1.0, 0.0, 1.0, 0.0, -1.0])?;
    src.set_spatial_ref(&src_srs)?;
    src.rasterband(1)?.fill(1.0)?;

    for multi in [false, true] {
        let mut dst = Dataset::create_with_band_type::<f32>(20, 1, 1)?;
        dst.set_geo_transform(&[0.0, 1.0, 0.0, 1.0, 0.0, -1.0])?;
        dst.set_spatial_ref(&dst_srs)?;
        let mut opts = ReprojectOptions::new();
        opts.with_transform_provider(registry.clone())
            .warp_options_mut()
            .with_resampling_alg(WarpResampleAlg::Sum)
            .with_multi(multi);
        reproject_image(&src, &mut dst, &opts)?;

        let sums = dst.rasterband(1)?.read_band_as::<f32>()?.data;
        for (col, sum) in sums.iter().enumerate().skip(5) {
            let expected = (2 * col + 1) as f32 / 10.0;
            assert!(
                (sum - expected).abs() < 1e-4,
                "column {col}: {sum} instead of {expected}"
            );
        }
    }
    Ok(())
}

#[test]
fn test_memory_limit_splits_tiles() -> Result<()> {
    init_logger();
    // one destination pixel averages 100x10 source pixels, a whole destination row
    // needs far more source than the smallest memory limit allows
    let src = patterned(1000, 100, 1);
    let source = band_data(&src, 1);

    let mut results = Vec::new();
    for multi in [false, true] {
        let mut dst = Dataset::create_with_band_type::<f32>(10, 10, 1)?;
        dst.set_geo_transform(&[0.0, 100.0, 0.0, 100.0, 0.0, -10.0])?;
        let mut opts = ReprojectOptions::new();
        opts.warp_options_mut()
            .with_resampling_alg(WarpResampleAlg::Average)
            .with_memory_limit(100_000)
            .with_multi(multi)
            .with_num_threads(NumThreads::Count(4));
        reproject_image(&src, &mut dst, &opts)?;

        let result = dst.rasterband(1)?.read_band_as::<f32>()?.data;
        for j in 0..10 {
            for i in 0..10 {
                let sum: u32 = (0..10)
                    .flat_map(|dy| (0..100).map(move |dx| (dx, dy)))
                    .map(|(dx, dy)| source[(10 * j + dy) * 1000 + 100 * i + dx] as u32)
                    .sum();
                let expected = sum as f32 / 1000.0;
                let got = result[j * 10 + i];
                assert!(
                    (got - expected).abs() < 1e-3,
                    "pixel ({i}, {j}): {got} instead of {expected}"
                );
            }
        }
        results.push(result);
    }
    assert_eq!(results[0], results[1]);
    Ok(())
}
