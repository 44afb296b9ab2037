//! Temporal combination and aggregation of raster stacks.
//!
//! [`combine_rasters_temporal`] stacks a chronologically ordered list of
//! single-band rasters into a [`TemporalCube`]; [`aggregate_temporal`]
//! groups the cube's time axis by a [`Period`] and writes one raster per
//! (group, statistic) pair.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use ndarray::{s, Array3, Axis};

use crate::{
    aggregate::{reduce_stack, Aggregation},
    errors::{HarvestError, Result},
    raster::{write_raster, Raster, RasterMeta},
};

/// A raster stack with a time coordinate of equal length. All
/// constituent rasters share one spatial shape and CRS; combine fails
/// fast if they do not.
#[derive(Debug, Clone)]
pub struct TemporalCube {
    data: Array3<f64>,
    times: Vec<NaiveDate>,
    meta: RasterMeta,
}

impl TemporalCube {
    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[NaiveDate] {
        &self.times
    }

    pub fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    /// time x rows x cols samples.
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }
}

fn parse_time_label(label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(label, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(label, "%Y%m%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{label}-01-01"), "%Y-%m-%d"))
        .map_err(|_| HarvestError::BadTimeLabel(label.to_string()))
}

/// Stack single-band rasters along a new time axis.
///
/// `files` must already be in chronological order (non-monotonic time
/// labels only log a warning). The per-file time label is read from the
/// default-domain metadata value under `attribute` and parsed as
/// `%Y-%m-%d`, `%Y%m%d` or a bare year. Any shape or CRS mismatch fails
/// the whole operation before a cube is produced.
pub fn combine_rasters_temporal<P: AsRef<Path>>(
    files: &[P],
    attribute: &str,
) -> Result<TemporalCube> {
    if files.is_empty() {
        return Err(HarvestError::EmptyInput);
    }

    let mut meta: Option<RasterMeta> = None;
    let mut times = Vec::with_capacity(files.len());
    let mut layers = Vec::with_capacity(files.len());
    for file in files {
        let raster = Raster::open(file)?;
        match &meta {
            None => meta = Some(raster.meta()?),
            Some(reference) => {
                if raster.shape() != reference.shape {
                    return Err(HarvestError::ShapeMismatch {
                        expected: reference.shape,
                        got: raster.shape(),
                    });
                }
                if raster.crs() != reference.crs {
                    return Err(HarvestError::CrsMismatch {
                        path: raster.path().display().to_string(),
                    });
                }
            }
        }
        if raster.num_bands() > 1 {
            log::warn!(
                "{} has {} bands, only the first joins the cube",
                raster.path().display(),
                raster.num_bands()
            );
        }
        let label = raster
            .metadata_item(attribute)
            .ok_or_else(|| HarvestError::MissingAttribute {
                key: attribute.to_string(),
                path: raster.path().display().to_string(),
            })?;
        times.push(parse_time_label(&label)?);
        layers.push(raster.read_band(0)?);
    }

    if times.windows(2).any(|pair| pair[0] > pair[1]) {
        log::warn!("time labels are not in ascending order; files are stacked as given");
    }

    let meta = meta.ok_or(HarvestError::EmptyInput)?;
    let (width, height) = meta.shape;
    let mut data = Array3::zeros((layers.len(), height, width));
    for (index, layer) in layers.iter().enumerate() {
        data.slice_mut(s![index, .., ..]).assign(layer);
    }
    Ok(TemporalCube { data, times, meta })
}

/// Grouping of a cube's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// One group per calendar year.
    Yearly,
    /// One group per calendar month, across years.
    Monthly,
    /// Consecutive runs of `n` raw time steps; a shorter remainder forms
    /// a final group.
    Steps(usize),
}

impl FromStr for Period {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "yearly" => Ok(Period::Yearly),
            "monthly" => Ok(Period::Monthly),
            _ => match value.parse::<usize>() {
                Ok(steps) if steps > 0 => Ok(Period::Steps(steps)),
                _ => Err(HarvestError::InvalidPeriod(value.to_string())),
            },
        }
    }
}

/// Group labels and member indices, in label order for the calendar
/// periods and positional order for step groups.
fn group_indices(times: &[NaiveDate], period: Period) -> Vec<(String, Vec<usize>)> {
    match period {
        Period::Yearly => {
            let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
            for (index, time) in times.iter().enumerate() {
                groups.entry(time.year()).or_default().push(index);
            }
            groups
                .into_iter()
                .map(|(year, indices)| (year.to_string(), indices))
                .collect()
        }
        Period::Monthly => {
            let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
            for (index, time) in times.iter().enumerate() {
                groups.entry(time.month()).or_default().push(index);
            }
            groups
                .into_iter()
                .map(|(month, indices)| (format!("{month:02}"), indices))
                .collect()
        }
        Period::Steps(steps) => {
            let chunks = (0..times.len()).chunks(steps);
            chunks
                .into_iter()
                .map(|chunk| {
                    let indices: Vec<usize> = chunk.collect();
                    let label = times[indices[0]].format("%Y-%m-%d").to_string();
                    (label, indices)
                })
                .collect()
        }
    }
}

/// Aggregate a cube over a time period, writing one raster per
/// (group, statistic) pair named `{prefix}_{agg}_{label}.tif`.
///
/// Period and aggregation arguments are validated before any raster is
/// written. Returns the output paths with the statistic that produced
/// each.
pub fn aggregate_temporal(
    cube: &TemporalCube,
    period: Period,
    agg: &[Aggregation],
    outfile: &Path,
) -> Result<Vec<(PathBuf, Aggregation)>> {
    if agg.is_empty() {
        return Err(HarvestError::EmptyInput);
    }
    if let Period::Steps(0) = period {
        return Err(HarvestError::InvalidPeriod("0".to_string()));
    }

    let groups = group_indices(&cube.times, period);
    let mut outputs = Vec::with_capacity(groups.len() * agg.len());
    for aggregation in agg {
        for (label, indices) in &groups {
            let stack = cube.data.select(Axis(0), indices);
            let path = PathBuf::from(format!(
                "{}_{}_{}.tif",
                outfile.display(),
                aggregation.name(),
                label
            ));
            write_raster(&path, &cube.meta, &[reduce_stack(&stack, *aggregation)])?;
            log::info!("{} of {} saved in {}", aggregation, label, path.display());
            outputs.push((path, *aggregation));
        }
    }
    Ok(outputs)
}
