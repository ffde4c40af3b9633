use std::sync::Arc;

use crate::raster::warp::WarpOptions;
use crate::spatial_ref::{SpatialRef, TransformProvider, TransformRegistry};

/// Settings for [`reproject_image`][super::reproject_image].
///
/// # Example
///
/// ```rust
/// use georaster::raster::warp::{ReprojectOptions, WarpResampleAlg};
/// use georaster::spatial_ref::SpatialRef;
///
/// let mut options = ReprojectOptions::new();
/// options
///     .with_dst_spatial_ref(SpatialRef::from_epsg(4326).unwrap())
///     .with_max_error(0.125)
///     .warp_options_mut()
///     .with_resampling_alg(WarpResampleAlg::Bilinear)
///     .with_multi(true);
/// assert_eq!(options.max_error(), Some(0.125));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReprojectOptions {
    warp_options: WarpOptions,
    max_error: Option<f64>,
    src_srs: Option<SpatialRef>,
    dst_srs: Option<SpatialRef>,
    src_nodata: Option<f64>,
    dst_nodata: Option<f64>,
    transform_provider: Option<Arc<dyn TransformProvider>>,
}

impl ReprojectOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the maximum error.
    ///
    /// Measured in input pixels, it is the allowed in approximating
    /// transformations.
    ///
    /// `0.0` indicates exact calculations.
    pub fn with_max_error(&mut self, max_error: f64) -> &mut Self {
        self.max_error = Some(max_error);
        self
    }

    /// Fetch the specified maximum error.
    ///
    /// Returns `None` if unset.
    pub fn max_error(&self) -> Option<f64> {
        self.max_error
    }

    /// Set the source spatial reference system.
    ///
    /// If not specified here, the source [`SpatialRef`] is read from the source dataset.
    ///
    /// If specified here, any [`SpatialRef`] in the source dataset is overridden.
    pub fn with_src_spatial_ref(&mut self, srs: SpatialRef) -> &mut Self {
        self.src_srs = Some(srs);
        self
    }

    /// Fetch the source spatial reference system, if set.
    pub fn src_spatial_ref(&self) -> Option<&SpatialRef> {
        self.src_srs.as_ref()
    }

    /// Set the destination spatial reference system.
    ///
    /// If not specified here, the destination [`SpatialRef`] is read from the destination dataset.
    ///
    /// If specified here, any [`SpatialRef`] in the destination dataset is overridden.
    pub fn with_dst_spatial_ref(&mut self, srs: SpatialRef) -> &mut Self {
        self.dst_srs = Some(srs);
        self
    }

    /// Fetch the destination spatial reference system, if set.
    pub fn dst_spatial_ref(&self) -> Option<&SpatialRef> {
        self.dst_srs.as_ref()
    }

    /// Specify the source no-data value.
    ///
    /// Overrides any no-data value specified in the source dataset.
    pub fn with_src_nodata(&mut self, nodata_value: f64) -> &mut Self {
        self.src_nodata = Some(nodata_value);
        self
    }

    /// Get the specified source no-data value, if any.
    pub fn src_nodata(&self) -> Option<f64> {
        self.src_nodata
    }

    /// Specify the destination no-data value.
    ///
    /// It is also stored on every destination band once the warp completes.
    pub fn with_dst_nodata(&mut self, nodata_value: f64) -> &mut Self {
        self.dst_nodata = Some(nodata_value);
        self
    }

    /// Get the specified destination no-data value, if any.
    pub fn dst_nodata(&self) -> Option<f64> {
        self.dst_nodata
    }

    /// Source of coordinate transformations between the two systems.
    ///
    /// Defaults to a plain [`TransformRegistry`].
    pub fn with_transform_provider(&mut self, provider: Arc<dyn TransformProvider>) -> &mut Self {
        self.transform_provider = Some(provider);
        self
    }

    pub fn transform_provider(&self) -> Arc<dyn TransformProvider> {
        self.transform_provider
            .clone()
            .unwrap_or_else(|| Arc::new(TransformRegistry::default()))
    }

    /// Set the general Warp options.
    pub fn with_warp_options(&mut self, warp_options: WarpOptions) -> &mut Self {
        self.warp_options = warp_options;
        self
    }

    /// Fetch an immutable reference to the general Warp options.
    pub fn warp_options(&self) -> &WarpOptions {
        &self.warp_options
    }

    /// Fetch a mutable reference to the general Warp options.
    pub fn warp_options_mut(&mut self) -> &mut WarpOptions {
        &mut self.warp_options
    }
}
