use std::fmt;

use crate::grid::GridError;

pub mod lows;
pub mod peaks;
pub mod row;
pub mod runner;
pub mod select;

pub use lows::{DetectionParams, find_lows, sector_mean};
pub use peaks::{InvalidInputError, find_peaks};
pub use row::{AslRow, Candidate};
pub use runner::{RunReport, run_detection};
pub use select::select_per_time;

#[derive(Debug)]
pub enum DetectError {
    Grid(GridError),
    Peaks(InvalidInputError),
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::Grid(e) => write!(f, "{}", e),
            DetectError::Peaks(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DetectError {}

impl From<GridError> for DetectError {
    fn from(err: GridError) -> DetectError {
        DetectError::Grid(err)
    }
}

impl From<InvalidInputError> for DetectError {
    fn from(err: InvalidInputError) -> DetectError {
        DetectError::Peaks(err)
    }
}
