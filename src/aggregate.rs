//! Per-pixel statistics over stacks of same-shape rasters.
//!
//! [`Aggregation`] is the closed set of reductions the toolkit knows;
//! names are resolved through [`FromStr`] so that unsupported names fail
//! at validation time, never mid-run. Reductions are NaN-aware: NaN
//! samples are dropped per pixel, an all-NaN pixel yields NaN (except
//! [`Aggregation::Sum`], which yields 0, matching `nansum`).

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use ndarray::{s, Array2, Array3};

use crate::{
    errors::{HarvestError, Result},
    raster::{write_raster, Raster},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Mean,
    Median,
    Sum,
    Perc95,
    Perc5,
    Max,
    Min,
}

impl Aggregation {
    pub const ALL: [Aggregation; 7] = [
        Aggregation::Mean,
        Aggregation::Median,
        Aggregation::Sum,
        Aggregation::Perc95,
        Aggregation::Perc5,
        Aggregation::Max,
        Aggregation::Min,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
            Aggregation::Sum => "sum",
            Aggregation::Perc95 => "perc95",
            Aggregation::Perc5 => "perc5",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
        }
    }

    /// Reduce the non-NaN samples of one pixel.
    fn reduce(self, values: &mut Vec<f64>) -> f64 {
        if values.is_empty() {
            return match self {
                Aggregation::Sum => 0.0,
                _ => f64::NAN,
            };
        }
        match self {
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregation::Median => percentile(values, 50.0),
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Perc95 => percentile(values, 95.0),
            Aggregation::Perc5 => percentile(values, 5.0),
            Aggregation::Max => values.iter().copied().fold(f64::MIN, f64::max),
            Aggregation::Min => values.iter().copied().fold(f64::MAX, f64::min),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = HarvestError;

    fn from_str(name: &str) -> Result<Self> {
        Aggregation::ALL
            .into_iter()
            .find(|aggregation| aggregation.name() == name)
            .ok_or_else(|| HarvestError::UnknownAggregation(name.to_string()))
    }
}

/// Linearly interpolated percentile, `numpy.percentile` semantics.
/// `values` must be non-empty and NaN-free; sorted in place.
fn percentile(values: &mut [f64], q: f64) -> f64 {
    values.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        values[lower]
    } else {
        values[lower] + (rank - lower as f64) * (values[upper] - values[lower])
    }
}

/// Per-pixel reduction along the leading axis of a stack.
pub(crate) fn reduce_stack(stack: &Array3<f64>, aggregation: Aggregation) -> Array2<f64> {
    let (_, rows, cols) = stack.dim();
    Array2::from_shape_fn((rows, cols), |(row, col)| {
        let mut values: Vec<f64> = stack
            .slice(s![.., row, col])
            .iter()
            .copied()
            .filter(|value| !value.is_nan())
            .collect();
        aggregation.reduce(&mut values)
    })
}

/// Max/min are only defined for temporal grouping; flat file stacks
/// support the five statistics of the batch contract.
fn validate_batch(agg: &[Aggregation]) -> Result<()> {
    if agg.is_empty() {
        return Err(HarvestError::EmptyInput);
    }
    for aggregation in agg {
        if matches!(aggregation, Aggregation::Max | Aggregation::Min) {
            return Err(HarvestError::UnsupportedBatchAggregation(*aggregation));
        }
    }
    Ok(())
}

fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}.tif", prefix.display(), suffix))
}

/// Sorted `*.tif` listing of a directory, for the glob form of the
/// batch reducers.
pub fn rasters_in_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| extension.eq_ignore_ascii_case("tif"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Reduce every band of every file into one stack and write one raster
/// per statistic, named `{prefix}_{agg}.tif`.
///
/// All inputs must share the shape of the first file, which also serves
/// as the metadata template; its open error propagates.
pub fn aggregate_rasters<P: AsRef<Path>>(
    files: &[P],
    agg: &[Aggregation],
    outfile: &Path,
) -> Result<Vec<PathBuf>> {
    validate_batch(agg)?;
    let first = files.first().ok_or(HarvestError::EmptyInput)?;
    let template = Raster::open(first)?;
    let meta = template.meta()?;
    let (width, height) = meta.shape;

    let mut layers: Vec<Array2<f64>> = Vec::new();
    for file in files {
        let raster = Raster::open(file)?;
        if raster.shape() != meta.shape {
            return Err(HarvestError::ShapeMismatch {
                expected: meta.shape,
                got: raster.shape(),
            });
        }
        for band in 0..raster.num_bands() {
            layers.push(raster.read_band(band)?);
        }
    }

    let mut stack = Array3::zeros((layers.len(), height, width));
    for (index, layer) in layers.iter().enumerate() {
        stack.slice_mut(s![index, .., ..]).assign(layer);
    }

    let mut outputs = Vec::new();
    for aggregation in agg {
        let path = suffixed(outfile, aggregation.name());
        write_raster(&path, &meta, &[reduce_stack(&stack, *aggregation)])?;
        log::info!("{} of {} rasters saved in {}", aggregation, files.len(), path.display());
        outputs.push(path);
    }
    Ok(outputs)
}

/// One output of [`aggregate_multiband`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultibandOutput {
    pub path: PathBuf,
    pub channel: usize,
    pub aggregation: Aggregation,
}

/// Reduce a stack of three-band files independently per band, writing
/// one raster per (band, statistic) pair, named
/// `{prefix}_{agg}_channel_{i}.tif`.
pub fn aggregate_multiband<P: AsRef<Path>>(
    files: &[P],
    agg: &[Aggregation],
    outfile: &Path,
) -> Result<Vec<MultibandOutput>> {
    const CHANNELS: usize = 3;
    validate_batch(agg)?;
    let first = files.first().ok_or(HarvestError::EmptyInput)?;
    let template = Raster::open(first)?;
    let meta = template.meta()?;
    let (width, height) = meta.shape;

    let mut channels: Vec<Vec<Array2<f64>>> = vec![Vec::new(); CHANNELS];
    for file in files {
        let raster = Raster::open(file)?;
        if raster.shape() != meta.shape {
            return Err(HarvestError::ShapeMismatch {
                expected: meta.shape,
                got: raster.shape(),
            });
        }
        if raster.num_bands() != CHANNELS {
            return Err(HarvestError::BandCountMismatch {
                expected: CHANNELS,
                got: raster.num_bands(),
                path: raster.path().display().to_string(),
            });
        }
        for channel in 0..CHANNELS {
            channels[channel].push(raster.read_band(channel)?);
        }
    }

    let mut outputs = Vec::new();
    for (channel, layers) in channels.iter().enumerate() {
        let mut stack = Array3::zeros((layers.len(), height, width));
        for (index, layer) in layers.iter().enumerate() {
            stack.slice_mut(s![index, .., ..]).assign(layer);
        }
        for aggregation in agg {
            let path = suffixed(outfile, &format!("{}_channel_{}", aggregation.name(), channel));
            write_raster(&path, &meta, &[reduce_stack(&stack, *aggregation)])?;
            outputs.push(MultibandOutput {
                path,
                channel,
                aggregation: *aggregation,
            });
        }
    }
    Ok(outputs)
}
