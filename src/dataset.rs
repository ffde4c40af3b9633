use std::sync::{Arc, RwLock, RwLockReadGuard};

use crate::errors::*;
use crate::raster::{BandData, DataType, GdalType, RasterBand, SharedBand};
use crate::spatial_ref::SpatialRef;
use crate::{DatasetOptions, GeoTransform, OpenFlags};

#[derive(Debug, Default)]
struct Georeference {
    geo_transform: Option<GeoTransform>,
    spatial_ref: Option<SpatialRef>,
}

#[derive(Debug)]
struct DatasetShared {
    open: RwLock<bool>,
    raster_size: (usize, usize),
    bands: Vec<SharedBand>,
    georeference: RwLock<Georeference>,
    is_raster: bool,
}

/// An in-memory raster dataset.
///
/// Cloning a `Dataset` (or [reopening](Dataset::reopen) it) yields another handle
/// to the same pixels. [`close`](Dataset::close) invalidates every handle and
/// every [`RasterBand`] obtained from them at once.
#[derive(Debug, Clone)]
pub struct Dataset {
    shared: Arc<DatasetShared>,
    flags: OpenFlags,
}

impl Dataset {
    /// Create a dataset of `band_count` bands of `data_type`, opened for update.
    ///
    /// # Example
    ///
    /// ```rust
    /// # fn main() -> georaster::errors::Result<()> {
    /// use georaster::raster::DataType;
    /// use georaster::Dataset;
    ///
    /// let ds = Dataset::create(300, 200, 2, DataType::Int16)?;
    /// assert_eq!(ds.raster_size(), (300, 200));
    /// assert_eq!(ds.raster_count(), 2);
    /// assert_eq!(ds.rasterband(1)?.band_type()?, DataType::Int16);
    /// # Ok(())
    /// # }
    /// ```
    pub fn create(
        width: usize,
        height: usize,
        band_count: usize,
        data_type: DataType,
    ) -> Result<Dataset> {
        Self::create_with_options(
            width,
            height,
            band_count,
            data_type,
            &DatasetOptions::default(),
        )
    }

    /// Create a dataset whose bands hold `T` values.
    pub fn create_with_band_type<T: GdalType>(
        width: usize,
        height: usize,
        band_count: usize,
    ) -> Result<Dataset> {
        Self::create(width, height, band_count, T::datatype())
    }

    pub fn create_with_options(
        width: usize,
        height: usize,
        band_count: usize,
        data_type: DataType,
        options: &DatasetOptions,
    ) -> Result<Dataset> {
        if width == 0 || height == 0 {
            return Err(RasterError::BadArgument(format!(
                "Raster size must be positive, got {width}x{height}"
            )));
        }
        let block_size = options.block_size.unwrap_or((width, 1));
        if block_size.0 == 0 || block_size.1 == 0 {
            return Err(RasterError::BadArgument(format!(
                "Block size must be positive, got {}x{}",
                block_size.0, block_size.1
            )));
        }
        let bands = (0..band_count)
            .map(|_| {
                Arc::new(RwLock::new(BandData::new(
                    data_type,
                    (width, height),
                    block_size,
                )))
            })
            .collect();
        log::debug!(
            "Created {width}x{height} dataset with {band_count} {data_type} band(s), block size {block_size:?}"
        );
        Ok(Dataset {
            shared: Arc::new(DatasetShared {
                open: RwLock::new(true),
                raster_size: (width, height),
                bands,
                georeference: RwLock::new(Georeference::default()),
                is_raster: true,
            }),
            flags: options.open_flags,
        })
    }

    /// Create a dataset without raster content, as a vector-only source would be.
    pub fn create_vector() -> Dataset {
        Dataset {
            shared: Arc::new(DatasetShared {
                open: RwLock::new(true),
                raster_size: (0, 0),
                bands: Vec::new(),
                georeference: RwLock::new(Georeference::default()),
                is_raster: false,
            }),
            flags: OpenFlags::UPDATE,
        }
    }

    /// Another handle to the same data with different access flags.
    pub fn reopen(&self, flags: OpenFlags) -> Result<Dataset> {
        let _open = self.open_guard()?;
        Ok(Dataset {
            shared: self.shared.clone(),
            flags,
        })
    }

    /// Shorthand for a read-only [`reopen`](Dataset::reopen).
    pub fn to_read_only(&self) -> Result<Dataset> {
        self.reopen(OpenFlags::READONLY)
    }

    pub fn read_only(&self) -> bool {
        !self.flags.contains(OpenFlags::UPDATE)
    }

    pub fn open_flags(&self) -> OpenFlags {
        self.flags
    }

    /// Closes the dataset and releases its pixel memory.
    ///
    /// Every handle and band of this dataset fails with [`RasterError::ClosedResource`]
    /// afterwards. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut open = self
            .shared
            .open
            .write()
            .map_err(|_| RasterError::UnexpectedLogicError("dataset lock poisoned".into()))?;
        if !*open {
            return Ok(());
        }
        *open = false;
        let mut poisoned = false;
        for band in &self.shared.bands {
            let mut data = band.write().unwrap_or_else(|e| {
                poisoned = true;
                e.into_inner()
            });
            data.pixels = Vec::new();
            data.overviews.clear();
        }
        log::debug!("Closed dataset of size {:?}", self.shared.raster_size);
        if poisoned {
            return Err(RasterError::UnexpectedLogicError(
                "band lock poisoned".into(),
            ));
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.read().map(|open| *open).unwrap_or(false)
    }

    /// Hold the dataset open for the guard's lifetime.
    pub(crate) fn open_guard(&self) -> Result<RwLockReadGuard<'_, bool>> {
        let open = self
            .shared
            .open
            .read()
            .map_err(|_| RasterError::UnexpectedLogicError("dataset lock poisoned".into()))?;
        if !*open {
            return Err(RasterError::ClosedResource { what: "Dataset" });
        }
        Ok(open)
    }

    /// `true` when the dataset holds raster content.
    pub fn is_raster(&self) -> bool {
        self.shared.is_raster
    }

    /// Size of the dataset in pixels, `(width, height)`.
    pub fn raster_size(&self) -> (usize, usize) {
        self.shared.raster_size
    }

    pub fn raster_count(&self) -> usize {
        self.shared.bands.len()
    }

    /// Fetch a band object for a dataset.
    ///
    /// Applies to raster datasets, and fetches the
    /// rasterband at the given _1-based_ index.
    pub fn rasterband(&self, band_index: usize) -> Result<RasterBand> {
        let _open = self.open_guard()?;
        let count = self.raster_count();
        if band_index == 0 || band_index > count {
            return Err(RasterError::BandOutOfRange {
                what: "Raster",
                index: band_index,
                count,
            });
        }
        Ok(RasterBand::new(
            self.clone(),
            self.shared.bands[band_index - 1].clone(),
            band_index,
        ))
    }

    /// All bands, in index order.
    pub fn rasterbands(&self) -> Result<Vec<RasterBand>> {
        (1..=self.raster_count())
            .map(|i| self.rasterband(i))
            .collect()
    }

    fn georeference(&self) -> Result<RwLockReadGuard<'_, Georeference>> {
        self.shared
            .georeference
            .read()
            .map_err(|_| RasterError::UnexpectedLogicError("dataset lock poisoned".into()))
    }

    fn update_georeference(&self, f: impl FnOnce(&mut Georeference)) -> Result<()> {
        let _open = self.open_guard()?;
        let mut georef = self
            .shared
            .georeference
            .write()
            .map_err(|_| RasterError::UnexpectedLogicError("dataset lock poisoned".into()))?;
        f(&mut georef);
        Ok(())
    }

    /// Affine transformation called geotransformation.
    ///
    /// This is like a linear transformation preserves points, straight lines and planes.
    /// Also, sets of parallel lines remain parallel after an affine transformation.
    /// # Arguments
    /// * transformation - coeficients of transformations
    ///
    /// x-coordinate of the top-left corner pixel (x-offset)
    /// width of a pixel (x-resolution)
    /// row rotation (typically zero)
    /// y-coordinate of the top-left corner pixel
    /// column rotation (typically zero)
    /// height of a pixel (y-resolution, typically negative)
    pub fn set_geo_transform(&self, transformation: &GeoTransform) -> Result<()> {
        let transformation = *transformation;
        self.update_georeference(|g| g.geo_transform = Some(transformation))
    }

    /// Get affine transformation coefficients.
    ///
    /// Fails with [`RasterError::NotARaster`] when none was set.
    pub fn geo_transform(&self) -> Result<GeoTransform> {
        let _open = self.open_guard()?;
        self.georeference()?
            .geo_transform
            .ok_or_else(|| RasterError::NotARaster {
                what: "Dataset",
                msg: "no geotransform set".to_string(),
            })
    }

    /// The dataset's coordinate system, if one was set.
    pub fn spatial_ref(&self) -> Result<Option<SpatialRef>> {
        let _open = self.open_guard()?;
        Ok(self.georeference()?.spatial_ref.clone())
    }

    pub fn set_spatial_ref(&self, spatial_ref: &SpatialRef) -> Result<()> {
        let spatial_ref = spatial_ref.clone();
        self.update_georeference(|g| g.spatial_ref = Some(spatial_ref))
    }

    /// Builds overviews for the current `Dataset`. See [`GDALBuildOverviews`].
    ///
    /// # Arguments
    /// * `resampling` - resampling method, one of `"NEAREST"` or `"AVERAGE"`
    /// * `overviews` - decimation factors of the overviews to build, each `>= 2`
    /// * `bands` - 1-based indices of the bands to process, all bands when empty
    ///
    /// Rebuilding an existing factor replaces it. Each band keeps its overviews ordered
    /// by decreasing resolution.
    ///
    /// [`GDALBuildOverviews`]: https://gdal.org/doxygen/gdal_8h.html#a767f4456a6249594ee18ea53f68b7e80
    pub fn build_overviews(
        &mut self,
        resampling: &str,
        overviews: &[usize],
        bands: &[usize],
    ) -> Result<()> {
        let average = match resampling.to_ascii_uppercase().as_str() {
            "NEAREST" => false,
            "AVERAGE" => true,
            other => {
                return Err(RasterError::BadArgument(format!(
                    "Unsupported overview resampling '{other}'"
                )))
            }
        };
        if let Some(f) = overviews.iter().find(|f| **f < 2) {
            return Err(RasterError::BadArgument(format!(
                "Overview factor must be at least 2, got {f}"
            )));
        }
        let selected = if bands.is_empty() {
            self.rasterbands()?
        } else {
            bands
                .iter()
                .map(|i| self.rasterband(*i))
                .collect::<Result<Vec<_>>>()?
        };

        let _open = self.open_guard()?;
        for band in selected {
            let mut data = band
                .shared()
                .write()
                .map_err(|_| RasterError::UnexpectedLogicError("band lock poisoned".into()))?;
            for &factor in overviews {
                let level = Arc::new(RwLock::new(data.decimate(factor, average)));
                data.overviews.retain(|(f, _)| *f != factor);
                data.overviews.push((factor, level));
            }
            data.overviews.sort_by_key(|(f, _)| *f);
            log::debug!(
                "Band {} has {} overview(s)",
                band.band_number(),
                data.overviews.len()
            );
        }
        Ok(())
    }
}
