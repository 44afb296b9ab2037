//! Typed harvest settings.
//!
//! A single configuration record with named fields, validated once,
//! replacing string-keyed settings lookups. Parsing a settings file into
//! this record is the orchestrator's concern; the core only consumes the
//! validated values.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::errors::{HarvestError, Result};

/// Geographic bounding box as `(left, bottom, right, top)` bounds, in
/// the units of the associated CRS.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundingBox {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        BoundingBox {
            left,
            bottom,
            right,
            top,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        longitude >= self.left
            && longitude <= self.right
            && latitude >= self.bottom
            && latitude <= self.top
    }

    pub fn validate(&self) -> Result<()> {
        if self.left >= self.right || self.bottom >= self.top {
            return Err(HarvestError::InvalidConfig(format!(
                "bounding box is not ordered: left {} right {} bottom {} top {}",
                self.left, self.right, self.bottom, self.top
            )));
        }
        Ok(())
    }
}

fn default_crs() -> String {
    "EPSG:4326".to_string()
}

/// Download/processing timeout; external service calls block the calling
/// thread for at most this long.
fn default_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HarvestConfig {
    /// Directory receiving output rasters and the log table CSV.
    pub outpath: PathBuf,
    pub bounds: BoundingBox,
    /// Output resolution, in the linear units of `crs`.
    pub resolution: f64,
    #[serde(default = "default_crs")]
    pub crs: String,
    #[serde(default)]
    pub date_min: Option<NaiveDate>,
    #[serde(default)]
    pub date_max: Option<NaiveDate>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<()> {
        self.bounds.validate()?;
        if self.resolution <= 0.0 {
            return Err(HarvestError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if let (Some(date_min), Some(date_max)) = (self.date_min, self.date_max) {
            if date_min > date_max {
                return Err(HarvestError::InvalidConfig(format!(
                    "date_min {date_min} is after date_max {date_max}"
                )));
            }
        }
        Ok(())
    }
}
