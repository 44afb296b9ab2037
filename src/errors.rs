use crate::aggregate::Aggregation;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    GdalError(#[from] gdal::errors::GdalError),
    #[error(transparent)]
    ProjError(#[from] proj::ProjError),
    #[error(transparent)]
    ProjCreateError(#[from] proj::ProjCreateError),
    #[error(transparent)]
    NdarrayError(#[from] ndarray::ShapeError),
    #[error(transparent)]
    CsvError(#[from] csv::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("unknown aggregation {0:?}, expected one of: mean, median, sum, perc95, perc5, max, min")]
    UnknownAggregation(String),
    #[error("aggregation {0} is only available for temporal cubes")]
    UnsupportedBatchAggregation(Aggregation),
    #[error("invalid temporal period {0:?}, expected \"yearly\", \"monthly\" or a positive step count")]
    InvalidPeriod(String),
    #[error("mismatched input lengths: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("raster shape {got:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("raster CRS does not match reference CRS in {path}")]
    CrsMismatch { path: String },
    #[error("expected {expected} bands, found {got} in {path}")]
    BandCountMismatch {
        expected: usize,
        got: usize,
        path: String,
    },
    #[error("metadata attribute {key:?} not found in {path}")]
    MissingAttribute { key: String, path: String },
    #[error("cannot parse time label {0:?}")]
    BadTimeLabel(String),
    #[error("no raster driver known for {0:?}")]
    UnsupportedFormat(String),
    #[error("no input rasters given")]
    EmptyInput,
    #[error("output grid is empty for the given bounds and resolution")]
    EmptyGrid,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
