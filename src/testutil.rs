//! Fixture rasters for the test suites, written through the crate's own
//! writer. All fixtures share a WGS84 grid with 0.01 degree pixels and
//! origin (149.0, -30.0), so a `(10, 10)` raster spans longitudes
//! 149.0..149.1 and latitudes -30.1..-30.0.

use std::path::{Path, PathBuf};

use geo::AffineTransform;
use ndarray::Array2;

use crate::raster::{write_raster, RasterMeta};

pub(crate) fn wgs84_meta(shape: (usize, usize)) -> RasterMeta {
    RasterMeta {
        shape,
        crs: "EPSG:4326".to_string(),
        transform: AffineTransform::new(0.01, 0., 149.0, 0., -0.01, -30.0),
        nodata: None,
        metadata: Default::default(),
    }
}

pub(crate) fn write_constant(
    dir: &Path,
    name: &str,
    value: f64,
    shape: (usize, usize),
    bands: usize,
) -> PathBuf {
    write_bands(dir, name, &vec![value; bands], shape)
}

/// One band per value, each filled with that constant.
pub(crate) fn write_bands(dir: &Path, name: &str, values: &[f64], shape: (usize, usize)) -> PathBuf {
    let path = dir.join(name);
    let meta = wgs84_meta(shape);
    let bands: Vec<Array2<f64>> = values
        .iter()
        .map(|value| Array2::from_elem((shape.1, shape.0), *value))
        .collect();
    write_raster(&path, &meta, &bands).unwrap();
    path
}

/// Single band holding each pixel's flat index, for bit-identity checks.
pub(crate) fn write_gradient(dir: &Path, name: &str, shape: (usize, usize)) -> PathBuf {
    let path = dir.join(name);
    let meta = wgs84_meta(shape);
    let band = Array2::from_shape_fn((shape.1, shape.0), |(row, col)| {
        (row * shape.0 + col) as f64
    });
    write_raster(&path, &meta, &[band]).unwrap();
    path
}

/// Constant single-band raster carrying a `date` metadata item.
pub(crate) fn write_with_time(
    dir: &Path,
    name: &str,
    value: f64,
    shape: (usize, usize),
    date: &str,
) -> PathBuf {
    let path = dir.join(name);
    let mut meta = wgs84_meta(shape);
    meta.metadata.insert("date".to_string(), date.to_string());
    write_raster(&path, &meta, &[Array2::from_elem((shape.1, shape.0), value)]).unwrap();
    path
}
