//! Nearest-neighbor raster reprojection.
//!
//! Every band is resampled with nearest-neighbor lookup only. That is
//! appropriate for categorical and administrative layers and lossy for
//! continuous surfaces; the kernel is deliberately not configurable.
//! Both operations write a new file and leave the source untouched.

use std::path::Path;

use geo::{AffineTransform, Coord};
use ndarray::Array2;
use proj::Proj;

use crate::{
    config::BoundingBox,
    errors::{HarvestError, Result},
    raster::{write_raster, Raster, RasterMeta},
    transform::pixel_index,
};

enum PointProjection {
    Identity,
    Proj(Proj),
}

impl PointProjection {
    /// Transform from `from` into `to`, skipping projection when the CRS
    /// strings already match.
    fn between(from: &str, to: &str) -> Result<Self> {
        if from.eq(to) {
            Ok(PointProjection::Identity)
        } else {
            Ok(PointProjection::Proj(Proj::new_known_crs(from, to, None)?))
        }
    }

    /// `None` when the point has no representation in the target CRS.
    fn convert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            PointProjection::Identity => Some((x, y)),
            PointProjection::Proj(proj) => proj.convert((x, y)).ok(),
        }
    }
}

/// Resample every band of `source` onto the grid described by `target`,
/// filling pixels outside source coverage with `nodata`.
fn resample_nearest(source: &Raster, target: &RasterMeta, nodata: f64) -> Result<Vec<Array2<f64>>> {
    let source_transform = source.transform()?;
    let projection = PointProjection::between(&target.crs, &source.crs())?;
    let (source_cols, source_rows) = source.shape();
    let (target_cols, target_rows) = target.shape;

    let mut bands = Vec::with_capacity(source.num_bands());
    for band in 0..source.num_bands() {
        let source_array = source.read_band(band)?;
        let mut output = Array2::from_elem((target_rows, target_cols), nodata);
        for row in 0..target_rows {
            for col in 0..target_cols {
                // sample at the output pixel center
                let center = target.transform.apply(Coord {
                    x: col as f64 + 0.5,
                    y: row as f64 + 0.5,
                });
                let Some((x, y)) = projection.convert(center.x, center.y) else {
                    continue;
                };
                let (source_row, source_col) = pixel_index(&source_transform, x, y);
                if source_row >= 0
                    && source_col >= 0
                    && (source_row as usize) < source_rows
                    && (source_col as usize) < source_cols
                {
                    output[[row, col]] = source_array[[source_row as usize, source_col as usize]];
                }
            }
        }
        bands.push(output);
    }
    Ok(bands)
}

/// Reproject and clip a raster to an output bounding box, resolution and
/// CRS, writing the result to `outfile`.
///
/// Output width/height are `round((right - left) / resolution)` and
/// `round((top - bottom) / resolution)`; a zero-sized grid fails before
/// any file is created. Returns the metadata of the written raster.
pub fn reproject_to_spec<P: AsRef<Path>, Q: AsRef<Path>>(
    infile: P,
    outfile: Q,
    bounds: &BoundingBox,
    resolution: f64,
    crs_out: &str,
    nodata: f64,
) -> Result<RasterMeta> {
    bounds.validate()?;
    if resolution <= 0.0 {
        return Err(HarvestError::InvalidConfig(format!(
            "resolution must be positive, got {resolution}"
        )));
    }
    let width = (bounds.width() / resolution).round() as usize;
    let height = (bounds.height() / resolution).round() as usize;
    if width == 0 || height == 0 {
        return Err(HarvestError::EmptyGrid);
    }

    let source = Raster::open(infile)?;
    let target = RasterMeta {
        shape: (width, height),
        crs: crs_out.to_string(),
        transform: AffineTransform::new(resolution, 0., bounds.left, 0., -resolution, bounds.top),
        nodata: Some(nodata),
        metadata: source.metadata(),
    };
    log::info!(
        "reprojecting {} to {}x{} pixels in {}",
        source.path().display(),
        width,
        height,
        crs_out
    );

    let bands = resample_nearest(&source, &target, nodata)?;
    write_raster(outfile, &target, &bands)?;
    Ok(target)
}

/// Reproject a raster onto the grid (shape, transform and CRS) of an
/// existing reference raster.
pub fn reproject_to_match<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    infile: P,
    matchfile: Q,
    outfile: R,
    nodata: f64,
) -> Result<RasterMeta> {
    let source = Raster::open(infile)?;
    let reference = Raster::open(matchfile)?;
    let target = RasterMeta {
        shape: reference.shape(),
        crs: reference.crs(),
        transform: reference.transform()?,
        nodata: Some(nodata),
        metadata: source.metadata(),
    };
    log::info!(
        "coregistering {} to the {}x{} grid of {}",
        source.path().display(),
        target.shape.0,
        target.shape.1,
        reference.path().display()
    );

    let bands = resample_nearest(&source, &target, nodata)?;
    write_raster(outfile, &target, &bands)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testutil, transform::affine_to_gdal};
    use rstest::rstest;

    fn fixture_bounds() -> BoundingBox {
        // matches the testutil fixture extent for a 10x10 raster
        BoundingBox {
            left: 149.0,
            bottom: -30.1,
            right: 149.1,
            top: -30.0,
        }
    }

    #[rstest]
    fn spec_covers_source_with_values() {
        let dir = tempfile::tempdir().unwrap();
        let input = testutil::write_constant(dir.path(), "in.tif", 5.0, (10, 10), 1);
        let output = dir.path().join("out.tif");

        let meta =
            reproject_to_spec(&input, &output, &fixture_bounds(), 0.02, "EPSG:4326", -1.0).unwrap();
        assert_eq!(meta.shape, (5, 5));

        let array = Raster::open(&output).unwrap().read_band(0).unwrap();
        assert!(array.iter().all(|value| *value == 5.0));
    }

    #[rstest]
    fn outside_coverage_is_filled_with_nodata() {
        let dir = tempfile::tempdir().unwrap();
        let input = testutil::write_constant(dir.path(), "in.tif", 5.0, (10, 10), 1);
        let output = dir.path().join("out.tif");

        // request a grid twice as wide as the source extent
        let bounds = BoundingBox {
            right: 149.2,
            ..fixture_bounds()
        };
        reproject_to_spec(&input, &output, &bounds, 0.02, "EPSG:4326", -1.0).unwrap();

        let array = Raster::open(&output).unwrap().read_band(0).unwrap();
        assert_eq!(array[[0, 0]], 5.0);
        assert_eq!(array[[0, 9]], -1.0);
    }

    #[rstest]
    fn spec_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let input = testutil::write_gradient(dir.path(), "in.tif", (10, 10));
        let first = dir.path().join("first.tif");
        let second = dir.path().join("second.tif");

        let bounds = fixture_bounds();
        reproject_to_spec(&input, &first, &bounds, 0.03, "EPSG:4326", 0.0).unwrap();
        reproject_to_spec(&input, &second, &bounds, 0.03, "EPSG:4326", 0.0).unwrap();

        let a = Raster::open(&first).unwrap();
        let b = Raster::open(&second).unwrap();
        assert_eq!(a.shape(), b.shape());
        assert_eq!(
            affine_to_gdal(&a.transform().unwrap()),
            affine_to_gdal(&b.transform().unwrap())
        );
        assert_eq!(a.read_band(0).unwrap(), b.read_band(0).unwrap());
    }

    #[rstest]
    fn match_adopts_reference_grid() {
        let dir = tempfile::tempdir().unwrap();
        let input = testutil::write_constant(dir.path(), "in.tif", 3.0, (10, 10), 2);
        let reference = testutil::write_constant(dir.path(), "ref.tif", 0.0, (5, 5), 1);
        let output = dir.path().join("out.tif");

        let meta = reproject_to_match(&input, &reference, &output, -1.0).unwrap();
        assert_eq!(meta.shape, (5, 5));

        let raster = Raster::open(&output).unwrap();
        // all source bands are resampled
        assert_eq!(raster.num_bands(), 2);
        assert!(raster.read_band(1).unwrap().iter().all(|value| *value == 3.0));
    }

    #[rstest]
    fn empty_grid_fails_before_io() {
        let result = reproject_to_spec(
            "in.tif",
            "out.tif",
            &fixture_bounds(),
            10.0,
            "EPSG:4326",
            0.0,
        );
        assert!(matches!(result, Err(HarvestError::EmptyGrid)));
    }
}
