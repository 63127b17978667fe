use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{Local, NaiveDate};

use crate::detect::{AslRow, Candidate};

/// Version of the calculation method (*not* the package version).
pub const CALCULATION_VERSION: &str = "3.20210820";

pub const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

const COLUMNS: [&str; 6] = [
    "time",
    "lon",
    "lat",
    "ActCenPres",
    "SectorPres",
    "RelCenPres",
];

#[derive(Debug)]
pub enum OutputError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "I/O error: {}", e),
            OutputError::Csv(e) => write!(f, "Failed to write CSV: {}", e),
        }
    }
}

impl std::error::Error for OutputError {}

impl From<std::io::Error> for OutputError {
    fn from(err: std::io::Error) -> OutputError {
        OutputError::Io(err)
    }
}

impl From<csv::Error> for OutputError {
    fn from(err: csv::Error) -> OutputError {
        OutputError::Csv(err)
    }
}

/// Write the ASL index table with its versioned header.
pub fn write_asl_csv<P: AsRef<Path>>(path: P, rows: &[AslRow]) -> Result<(), OutputError> {
    write_asl_csv_dated(path, rows, Local::now().date_naive())
}

/// Write every detected low, not just the per-time-step ASL picks.
pub fn write_all_lows_csv<P: AsRef<Path>>(
    path: P,
    candidates: &[Candidate],
) -> Result<(), OutputError> {
    write_all_lows_csv_dated(path, candidates, Local::now().date_naive())
}

fn write_asl_csv_dated<P: AsRef<Path>>(
    path: P,
    rows: &[AslRow],
    date_created: NaiveDate,
) -> Result<(), OutputError> {
    let mut file = File::create(path)?;
    write_header(&mut file, "Amundsen Sea Low (ASL) Index", date_created)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record([
            row.time.format("%Y-%m-%d").to_string(),
            render(row.lon),
            render(row.lat),
            render(row.act_cen_pres),
            render(row.sector_pres),
            render(row.rel_cen_pres),
        ])?;
    }
    writer.flush().map_err(OutputError::Io)?;

    Ok(())
}

fn write_all_lows_csv_dated<P: AsRef<Path>>(
    path: P,
    candidates: &[Candidate],
    date_created: NaiveDate,
) -> Result<(), OutputError> {
    let mut file = File::create(path)?;
    write_header(
        &mut file,
        "Detected lows within the Pacific sector of the Southern Ocean",
        date_created,
    )?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(COLUMNS)?;
    for candidate in candidates {
        writer.write_record([
            candidate.time.format("%Y-%m-%d").to_string(),
            candidate.lon.to_string(),
            candidate.lat.to_string(),
            candidate.act_cen_pres.to_string(),
            render(candidate.sector_pres),
            render(candidate.rel_cen_pres),
        ])?;
    }
    writer.flush().map_err(OutputError::Io)?;

    Ok(())
}

fn write_header(file: &mut File, title: &str, date_created: NaiveDate) -> Result<(), OutputError> {
    writeln!(file, "# {}", title)?;
    writeln!(file, "# calculation_version: {}", CALCULATION_VERSION)?;
    writeln!(file, "# software_version: {}", SOFTWARE_VERSION)?;
    writeln!(file, "# date_created: {}", date_created.format("%Y%m%d"))?;

    Ok(())
}

fn render(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
