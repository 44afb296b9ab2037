//! Point-value extraction from rasters.
//!
//! [`raster_query`] samples the first band of each raster at a set of
//! longitude/latitude points and returns a [`SampleTable`] with one
//! column per raster. Sampling never raises per point: an index outside
//! the raster is recorded as missing, distinguishable from a true zero
//! reading ([`SampleTable::value_or_zero`] restores the legacy sentinel
//! for consumers that expect it).

use std::path::Path;

use crate::{
    errors::{HarvestError, Result},
    raster::Raster,
    transform::pixel_index,
};

#[derive(Debug, Clone)]
pub struct SampleColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// One row per point, one column per sampled raster. Points carry the
/// WGS84 CRS of the query coordinates.
#[derive(Debug, Clone)]
pub struct SampleTable {
    crs: String,
    longitudes: Vec<f64>,
    latitudes: Vec<f64>,
    columns: Vec<SampleColumn>,
}

impl SampleTable {
    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn num_points(&self) -> usize {
        self.longitudes.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn columns(&self) -> &[SampleColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&SampleColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Sampled value at `point` in `column`; `None` when the point fell
    /// outside the raster or its column could not be read.
    pub fn value(&self, point: usize, column: &str) -> Option<f64> {
        self.column(column)?.values.get(point).copied()?
    }

    /// Legacy sentinel semantics: out-of-range lookups read as 0.
    pub fn value_or_zero(&self, point: usize, column: &str) -> f64 {
        self.value(point, column).unwrap_or(0.0)
    }

    /// Write the table as CSV: `Longitude,Latitude` plus one column per
    /// raster; missing values are empty fields.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["Longitude".to_string(), "Latitude".to_string()];
        header.extend(self.columns.iter().map(|column| column.name.clone()));
        writer.write_record(&header)?;
        for point in 0..self.num_points() {
            let mut record = vec![
                self.longitudes[point].to_string(),
                self.latitudes[point].to_string(),
            ];
            record.extend(self.columns.iter().map(|column| {
                column.values[point]
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            }));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn column_name<P: AsRef<Path>>(path: P, title: Option<&String>) -> String {
    match title {
        Some(title) => title.clone(),
        None => path
            .as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.as_ref().display().to_string()),
    }
}

/// Sample the first band of each raster at every `(longitude, latitude)`
/// point.
///
/// Input lengths are validated before any file is opened. Bands beyond
/// the first are ignored (documented limitation; a warning is logged).
/// A raster that fails to open fails only its own column, which comes
/// back all-missing. Column names are the supplied titles or the raster
/// file stems.
pub fn raster_query<P: AsRef<Path>>(
    longitudes: &[f64],
    latitudes: &[f64],
    rasters: &[P],
    titles: Option<&[String]>,
) -> Result<SampleTable> {
    if longitudes.len() != latitudes.len() {
        return Err(HarvestError::LengthMismatch {
            left: longitudes.len(),
            right: latitudes.len(),
        });
    }
    if let Some(titles) = titles {
        if titles.len() != rasters.len() {
            return Err(HarvestError::LengthMismatch {
                left: titles.len(),
                right: rasters.len(),
            });
        }
    }

    let mut columns = Vec::with_capacity(rasters.len());
    for (index, path) in rasters.iter().enumerate() {
        let name = column_name(path, titles.map(|titles| &titles[index]));
        let values = match sample_raster(path, longitudes, latitudes) {
            Ok(values) => values,
            Err(error) => {
                log::warn!(
                    "failed to sample {}: {}; column {:?} left empty",
                    path.as_ref().display(),
                    error,
                    name
                );
                vec![None; longitudes.len()]
            }
        };
        columns.push(SampleColumn { name, values });
    }

    Ok(SampleTable {
        crs: "EPSG:4326".to_string(),
        longitudes: longitudes.to_vec(),
        latitudes: latitudes.to_vec(),
        columns,
    })
}

fn sample_raster<P: AsRef<Path>>(
    path: P,
    longitudes: &[f64],
    latitudes: &[f64],
) -> Result<Vec<Option<f64>>> {
    let raster = Raster::open(&path)?;
    if raster.num_bands() > 1 {
        log::warn!(
            "{} has {} bands, only the first is sampled",
            path.as_ref().display(),
            raster.num_bands()
        );
    }
    let transform = raster.transform()?;
    let array = raster.read_band(0)?;
    let (rows, cols) = array.dim();

    Ok(longitudes
        .iter()
        .zip(latitudes)
        .map(|(&longitude, &latitude)| {
            let (row, col) = pixel_index(&transform, longitude, latitude);
            if row >= 0 && col >= 0 && (row as usize) < rows && (col as usize) < cols {
                Some(array[[row as usize, col as usize]])
            } else {
                None
            }
        })
        .collect())
}

/// Indices inside a circle of pixel radius `radius` around `(row, col)`,
/// clamped to the array edges (no wrap-around).
fn points_in_circle(
    row: isize,
    col: isize,
    radius: f64,
    rows: usize,
    cols: usize,
) -> Vec<(usize, usize)> {
    let mut points = Vec::new();
    let row_min = (row as f64 - radius).ceil() as isize;
    let row_max = (row as f64 + radius).ceil() as isize;
    for i in row_min..row_max {
        let half_chord = (radius * radius - ((i - row) as f64).powi(2)).sqrt();
        let col_min = (col as f64 - half_chord).ceil() as isize;
        let col_max = (col as f64 + half_chord).ceil() as isize;
        for j in col_min..col_max {
            if i >= 0 && (i as usize) < rows && j >= 0 && (j as usize) < cols {
                points.push((i as usize, j as usize));
            }
        }
    }
    points
}

/// All first-band values within a circular buffer of `radius` pixels
/// around the given point.
pub fn raster_buffer<P: AsRef<Path>>(
    longitude: f64,
    latitude: f64,
    raster: P,
    radius: f64,
) -> Result<Vec<f64>> {
    let raster = Raster::open(&raster)?;
    let transform = raster.transform()?;
    let array = raster.read_band(0)?;
    let (rows, cols) = array.dim();
    let (row, col) = pixel_index(&transform, longitude, latitude);
    Ok(points_in_circle(row, col, radius, rows, cols)
        .into_iter()
        .map(|index| array[index])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use rstest::rstest;

    #[rstest]
    fn samples_constant_rasters_by_title() {
        let dir = tempfile::tempdir().unwrap();
        let a = testutil::write_constant(dir.path(), "a.tif", 1.5, (10, 10), 1);
        let b = testutil::write_constant(dir.path(), "b.tif", 4.0, (10, 10), 1);

        // points inside the fixture extent (see testutil::wgs84_meta)
        let table = raster_query(
            &[149.05, 149.02],
            &[-30.05, -30.02],
            &[a, b],
            Some(&["first".to_string(), "second".to_string()]),
        )
        .unwrap();

        assert_eq!(table.num_points(), 2);
        assert_eq!(table.value(0, "first"), Some(1.5));
        assert_eq!(table.value(1, "second"), Some(4.0));
    }

    #[rstest]
    fn column_names_default_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let a = testutil::write_constant(dir.path(), "elevation.tif", 1.0, (4, 4), 1);
        let table = raster_query(&[149.01], &[-30.01], &[a], None).unwrap();
        assert!(table.column("elevation").is_some());
    }

    #[rstest]
    fn zero_points_keep_columns() {
        let dir = tempfile::tempdir().unwrap();
        let a = testutil::write_constant(dir.path(), "a.tif", 1.0, (4, 4), 1);
        let table = raster_query(&[], &[], &[a], None).unwrap();
        assert_eq!(table.num_points(), 0);
        assert_eq!(table.num_columns(), 1);
    }

    #[rstest]
    fn far_outside_point_degrades_to_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = testutil::write_constant(dir.path(), "a.tif", 9.0, (4, 4), 1);
        let table = raster_query(&[0.0], &[80.0], &[a], None).unwrap();
        assert_eq!(table.value(0, "a"), None);
        assert_eq!(table.value_or_zero(0, "a"), 0.0);
    }

    #[rstest]
    fn mismatched_lengths_fail_before_io() {
        let result = raster_query(&[1.0, 2.0], &[1.0], &["missing.tif"], None);
        assert!(matches!(result, Err(HarvestError::LengthMismatch { .. })));
    }

    #[rstest]
    fn unreadable_raster_fails_only_its_column() {
        let dir = tempfile::tempdir().unwrap();
        let good = testutil::write_constant(dir.path(), "good.tif", 2.0, (4, 4), 1);
        let bad = dir.path().join("missing.tif");

        let table = raster_query(&[149.01], &[-30.01], &[good, bad], None).unwrap();
        assert_eq!(table.value(0, "good"), Some(2.0));
        assert_eq!(table.value(0, "missing"), None);
    }

    #[rstest]
    fn csv_export_has_coordinates_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let a = testutil::write_constant(dir.path(), "a.tif", 3.0, (4, 4), 1);
        let table = raster_query(&[149.01, 0.0], &[-30.01, 80.0], &[a], None).unwrap();

        let csv_path = dir.path().join("samples.csv");
        table.to_csv(&csv_path).unwrap();
        let contents = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Longitude,Latitude,a"));
        assert_eq!(lines.next(), Some("149.01,-30.01,3"));
        // missing sample exports as an empty field, not 0
        assert_eq!(lines.next(), Some("0,80,"));
    }

    #[rstest]
    fn buffer_collects_circle_of_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let a = testutil::write_constant(dir.path(), "a.tif", 1.0, (10, 10), 1);
        // center of the fixture raster, radius of two pixels
        let values = raster_buffer(149.05, -30.05, &a, 2.0).unwrap();
        assert!(!values.is_empty());
        assert!(values.len() < 100);
        assert!(values.iter().all(|value| *value == 1.0));
    }

    #[rstest]
    fn buffer_clamps_at_edges() {
        let dir = tempfile::tempdir().unwrap();
        let a = testutil::write_constant(dir.path(), "a.tif", 1.0, (4, 4), 1);
        // corner pixel; most of the circle falls outside the raster
        let values = raster_buffer(149.005, -30.005, &a, 3.0).unwrap();
        assert!(values.len() < 9 * 4);
        assert!(values.iter().all(|value| *value == 1.0));
    }
}
