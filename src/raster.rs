//! GDAL-backed raster access.
//!
//! [`Raster`] wraps an opened dataset and reads bands into `f64` arrays
//! regardless of the stored pixel type. [`RasterMeta`] is the writable
//! subset of a raster's georeferencing, used as the template for every
//! output file. Rasters are never mutated in place; all transform
//! operations write new files through [`write_raster`].

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use gdal::{
    raster::Buffer, spatial_ref::SpatialRef, Dataset as GdalDataset, DriverManager,
    Metadata as GdalMetadata, MetadataEntry as GdalMetadataEntry,
};
use geo::AffineTransform;
use ndarray::{s, Array2, Array3};

use crate::{
    errors::{HarvestError, Result},
    transform::{affine_from_gdal, affine_to_gdal},
};

fn filter_metadata_gdal(metadata: &impl GdalMetadata) -> HashMap<String, String> {
    GdalMetadata::metadata(metadata)
        .filter_map(|GdalMetadataEntry { domain, key, value }| {
            if domain.eq("") {
                Some((key, value))
            } else {
                None
            }
        })
        .collect()
}

/// Georeferencing template for raster output: pixel shape as
/// `(width, height)`, CRS, affine transform, optional nodata value and
/// default-domain metadata items.
#[derive(Debug, Clone)]
pub struct RasterMeta {
    pub shape: (usize, usize),
    pub crs: String,
    pub transform: AffineTransform,
    pub nodata: Option<f64>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug)]
pub struct Raster {
    path: PathBuf,
    dataset: GdalDataset,
}

impl Raster {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dataset = GdalDataset::open(&path)?;
        Ok(Raster {
            path: path.as_ref().to_path_buf(),
            dataset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pixel shape as `(width, height)`.
    pub fn shape(&self) -> (usize, usize) {
        self.dataset.raster_size()
    }

    pub fn crs(&self) -> String {
        self.dataset.projection()
    }

    pub fn transform(&self) -> Result<AffineTransform> {
        Ok(affine_from_gdal(self.dataset.geo_transform()?))
    }

    pub fn num_bands(&self) -> usize {
        self.dataset.raster_count()
    }

    /// Nodata value of the first band, if declared.
    pub fn nodata(&self) -> Result<Option<f64>> {
        Ok(self.dataset.rasterband(1)?.no_data_value())
    }

    pub fn metadata(&self) -> HashMap<String, String> {
        filter_metadata_gdal(&self.dataset)
    }

    pub fn metadata_item(&self, key: &str) -> Option<String> {
        self.dataset.metadata_item(key, "")
    }

    pub fn meta(&self) -> Result<RasterMeta> {
        Ok(RasterMeta {
            shape: self.shape(),
            crs: self.crs(),
            transform: self.transform()?,
            nodata: self.nodata()?,
            metadata: self.metadata(),
        })
    }

    /// Read one band (0-based index) as a rows x cols array of `f64`.
    pub fn read_band(&self, index: usize) -> Result<Array2<f64>> {
        let (width, height) = self.shape();
        let buffer =
            self.dataset
                .rasterband(index + 1)?
                .read_as::<f64>((0, 0), (width, height), (width, height), None)?;
        Ok(Array2::from_shape_vec(
            (height, width),
            buffer.data().to_vec(),
        )?)
    }

    /// Read every band as a bands x rows x cols array of `f64`.
    pub fn read_bands(&self) -> Result<Array3<f64>> {
        let (width, height) = self.shape();
        let mut array = Array3::zeros((self.num_bands(), height, width));
        for index in 0..self.num_bands() {
            array
                .slice_mut(s![index, .., ..])
                .assign(&self.read_band(index)?);
        }
        Ok(array)
    }
}

fn driver_for<P: AsRef<Path>>(path: P) -> Result<gdal::Driver> {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let name = match extension.as_str() {
        "tif" | "tiff" => "GTiff",
        "nc" => "netCDF",
        _ => {
            return Err(HarvestError::UnsupportedFormat(
                path.as_ref().display().to_string(),
            ))
        }
    };
    Ok(DriverManager::get_driver_by_name(name)?)
}

/// Write `bands` (each rows x cols, all of `meta.shape`) to a new raster
/// file. The driver is chosen from the file extension (`.tif`/`.tiff`,
/// `.nc`); anything else fails before any file is created.
pub fn write_raster<P: AsRef<Path>>(
    path: P,
    meta: &RasterMeta,
    bands: &[Array2<f64>],
) -> Result<()> {
    let driver = driver_for(&path)?;
    let (width, height) = meta.shape;
    for band in bands {
        let got = (band.ncols(), band.nrows());
        if got != meta.shape {
            return Err(HarvestError::ShapeMismatch {
                expected: meta.shape,
                got,
            });
        }
    }

    let mut dataset = driver.create_with_band_type::<f64, _>(&path, width, height, bands.len())?;
    dataset.set_geo_transform(&affine_to_gdal(&meta.transform))?;
    if !meta.crs.is_empty() {
        dataset.set_spatial_ref(&SpatialRef::from_definition(&meta.crs)?)?;
    }
    for (key, value) in &meta.metadata {
        dataset.set_metadata_item(key, value, "")?;
    }
    for (index, band) in bands.iter().enumerate() {
        let mut rasterband = dataset.rasterband(index + 1)?;
        if let Some(nodata) = meta.nodata {
            rasterband.set_no_data_value(Some(nodata))?;
        }
        let mut buffer = Buffer::new((width, height), band.iter().copied().collect());
        rasterband.write((0, 0), (width, height), &mut buffer)?;
    }
    Ok(())
}
