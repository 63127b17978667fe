use std::fmt;

use crate::grid::{GridError, GridFrame, RegionMask};

/// Source of gridded input data. The calculator only sees this seam, so tests
/// can substitute synthetic grids for the GDAL-backed implementation.
pub trait GridSource {
    /// All pressure frames, sorted by time, one per time step.
    fn read_msl_stack(&self) -> Result<Vec<GridFrame>, ReadError>;

    /// The static land-sea mask.
    fn read_mask(&self) -> Result<RegionMask, ReadError>;
}

#[derive(Debug)]
pub enum ReadError {
    Gdal(String),
    TimeAxis(String),
    Pattern(String),
    NoFilesMatched(String),
    Grid(GridError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Gdal(msg) => write!(f, "GDAL error: {}", msg),
            ReadError::TimeAxis(msg) => write!(f, "Cannot decode time axis: {}", msg),
            ReadError::Pattern(msg) => write!(f, "Invalid file pattern: {}", msg),
            ReadError::NoFilesMatched(pattern) => {
                write!(f, "No files matched pattern: {}", pattern)
            }
            ReadError::Grid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<GridError> for ReadError {
    fn from(err: GridError) -> ReadError {
        ReadError::Grid(err)
    }
}
