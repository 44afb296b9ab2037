//! Raster processing core for geodata-harvesting pipelines.
//!
//! Raw raster files, already downloaded from their WCS/GEE sources, flow
//! through here: [`reproject_to_spec`]/[`reproject_to_match`] unify CRS,
//! resolution and extent; [`combine_rasters_temporal`] stacks time steps
//! into a [`TemporalCube`] that [`aggregate_temporal`] reduces per
//! period; [`aggregate_rasters`]/[`aggregate_multiband`] reduce flat
//! file stacks; and [`raster_query`] extracts per-point values into a
//! [`SampleTable`]. Every processing step can be recorded in a
//! [`LogTable`] keyed by unique output filename.
//!
//! All raster I/O goes through GDAL; everything runs single-threaded and
//! reads whole rasters into memory, so callers choose bounding boxes and
//! resolutions that fit.

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod logtable;
pub mod raster;
pub mod reproject;
pub mod sample;
pub mod temporal;
pub mod transform;

#[cfg(test)]
pub(crate) mod testutil;

pub use aggregate::{
    aggregate_multiband, aggregate_rasters, rasters_in_dir, Aggregation, MultibandOutput,
};
pub use config::{BoundingBox, HarvestConfig};
pub use errors::{HarvestError, Result};
pub use logtable::{LogEntry, LogTable};
pub use raster::{write_raster, Raster, RasterMeta};
pub use reproject::{reproject_to_match, reproject_to_spec};
pub use sample::{raster_buffer, raster_query, SampleColumn, SampleTable};
pub use temporal::{aggregate_temporal, combine_rasters_temporal, Period, TemporalCube};
pub use transform::pixel_index;
