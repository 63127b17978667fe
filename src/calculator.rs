use std::fmt;

use crate::config::Config;
use crate::detect::{RunReport, run_detection};
use crate::grid::{GridError, GridFrame, RegionMask, season_mean};
use crate::output::{self, OutputError};
use crate::readers::{GdalSource, GridSource, ReadError};

#[derive(Debug)]
pub enum CalcError {
    MaskRead(ReadError),
    MslRead(ReadError),
    MaskNotLoaded,
    MslNotLoaded,
    NotCalculated,
    Slice(GridError),
    Season(GridError),
    Output(OutputError),
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::MaskRead(e) => write!(f, "Failed to load land-sea mask: {}", e),
            CalcError::MslRead(e) => {
                write!(f, "Failed to load mean sea level pressure data: {}", e)
            }
            CalcError::MaskNotLoaded => {
                write!(f, "Must read in land-sea mask before mean sea level data")
            }
            CalcError::MslNotLoaded => {
                write!(f, "Must read in mean sea level data before calculating")
            }
            CalcError::NotCalculated => {
                write!(f, "No results yet: run calculate() before writing output")
            }
            CalcError::Slice(e) => write!(f, "Failed to slice detection sector: {}", e),
            CalcError::Season(e) => write!(f, "Failed to build seasonal means: {}", e),
            CalcError::Output(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for CalcError {}

impl From<OutputError> for CalcError {
    fn from(err: OutputError) -> CalcError {
        CalcError::Output(err)
    }
}

/// Handles one full calculation of the Amundsen Sea Low index: read the mask
/// and pressure stack, run detection over every time step, write the CSVs.
pub struct AsliCalculator {
    config: Config,
    source: Box<dyn GridSource>,
    mask: Option<RegionMask>,
    sliced_msl: Option<Vec<GridFrame>>,
    report: Option<RunReport>,
}

impl AsliCalculator {
    pub fn new(config: Config) -> Self {
        let source = Box::new(GdalSource::from_config(&config));
        Self::with_source(config, source)
    }

    /// Build against an alternative data source.
    pub fn with_source(config: Config, source: Box<dyn GridSource>) -> Self {
        AsliCalculator {
            config,
            source,
            mask: None,
            sliced_msl: None,
            report: None,
        }
    }

    /// Reads the land-sea mask from `<data_dir>/<mask_filename>`.
    pub fn read_mask_data(&mut self) -> Result<(), CalcError> {
        let mask = self.source.read_mask().map_err(CalcError::MaskRead)?;

        log::info!(
            "loaded land-sea mask ({} x {} cells)",
            mask.lats().len(),
            mask.lons().len()
        );
        self.mask = Some(mask);

        Ok(())
    }

    /// Reads the pressure files matching `<data_dir>/<msl_pattern>` and
    /// restricts every time step to the detection sector (the ASL box plus
    /// its border). The mask must already be loaded.
    pub fn read_msl_data(&mut self) -> Result<(), CalcError> {
        if self.mask.is_none() {
            return Err(CalcError::MaskNotLoaded);
        }

        let frames = self.source.read_msl_stack().map_err(CalcError::MslRead)?;

        let sector = self
            .config
            .asl_region()
            .with_border(self.config.detection_border());

        let mut sliced = Vec::with_capacity(frames.len());
        for frame in &frames {
            sliced.push(frame.slice(&sector).map_err(CalcError::Slice)?);
        }

        log::info!(
            "loaded {} pressure time step(s) over the detection sector",
            sliced.len()
        );
        self.sliced_msl = Some(sliced);

        Ok(())
    }

    /// Convenience method for reading in both mask and msl data files.
    pub fn read_data(&mut self) -> Result<(), CalcError> {
        self.read_mask_data()?;
        self.read_msl_data()
    }

    /// Runs the detection over every loaded time step, optionally on seasonal
    /// (quarterly) means instead of the native time axis, fanning out over
    /// `n_jobs` workers.
    pub fn calculate(&mut self, n_jobs: usize, seasonal: bool) -> Result<&RunReport, CalcError> {
        let mask = self.mask.as_ref().ok_or(CalcError::MaskNotLoaded)?;
        let frames = self.sliced_msl.as_ref().ok_or(CalcError::MslNotLoaded)?;

        let seasonal_frames;
        let frames = if seasonal {
            seasonal_frames = season_mean(frames).map_err(CalcError::Season)?;
            &seasonal_frames
        } else {
            frames
        };

        let report = run_detection(frames, mask, &self.config.detection_params(), n_jobs);

        if !report.failed_steps.is_empty() {
            log::warn!(
                "{} time step(s) failed and carry placeholder rows",
                report.failed_steps.len()
            );
        }

        Ok(self.report.insert(report))
    }

    /// Writes the ASL index as a CSV with header, under the data directory.
    pub fn write_asl_csv(&self, filename: &str) -> Result<(), CalcError> {
        let report = self.report.as_ref().ok_or(CalcError::NotCalculated)?;
        let path = self.config.data_dir().join(filename);

        output::write_asl_csv(&path, &report.asl_rows)?;
        log::info!("wrote {} ASL row(s) to {}", report.asl_rows.len(), path.display());

        Ok(())
    }

    /// Writes every detected low, under the data directory.
    pub fn write_all_lows_csv(&self, filename: &str) -> Result<(), CalcError> {
        let report = self.report.as_ref().ok_or(CalcError::NotCalculated)?;
        let path = self.config.data_dir().join(filename);

        output::write_all_lows_csv(&path, &report.all_lows)?;
        log::info!(
            "wrote {} candidate low(s) to {}",
            report.all_lows.len(),
            path.display()
        );

        Ok(())
    }
}
