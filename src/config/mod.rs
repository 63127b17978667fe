use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::detect::DetectionParams;
use crate::region::Region;

pub mod error;
pub use error::ConfigError;

/// Run configuration, threaded explicitly through every stage. Defaults match
/// the ERA5 monthly workflow; a JSON config file may override any subset and
/// the CLI overrides the file.
#[derive(Debug, Clone)]
pub struct Config {
    data_dir: PathBuf,
    mask_filename: String,
    msl_pattern: String,
    msl_variable: String,
    mask_variable: String,
    asl_region: Region,
    detection_border: f64,
    mask_threshold: f64,
    min_distance: usize,
    max_lows: usize,
    n_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./data"),
            mask_filename: "era5_lsm.nc".to_string(),
            msl_pattern: "monthly/era5_mean_sea_level_pressure_monthly_*.nc".to_string(),
            msl_variable: "msl".to_string(),
            mask_variable: "lsm".to_string(),
            asl_region: Region::amundsen_sea(),
            detection_border: 8.0,
            mask_threshold: 0.5,
            min_distance: 5,
            max_lows: 3,
            n_jobs: 1,
        }
    }
}

// Deserializes a Config, validating the region bounds, mask threshold and
// detection border. Absent fields keep their defaults.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ConfigHelper {
            data_dir: Option<PathBuf>,
            mask_filename: Option<String>,
            msl_pattern: Option<String>,
            msl_variable: Option<String>,
            mask_variable: Option<String>,
            asl_region: Option<RegionHelper>,
            detection_border: Option<f64>,
            mask_threshold: Option<f64>,
            min_distance: Option<usize>,
            max_lows: Option<usize>,
            n_jobs: Option<usize>,
        }

        #[derive(Deserialize)]
        struct RegionHelper {
            west: f64,
            east: f64,
            south: f64,
            north: f64,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;
        let defaults = Config::default();

        let asl_region = match helper.asl_region {
            Some(r) => Region::new(r.west, r.east, r.south, r.north)
                .map_err(|e| D::Error::custom(ConfigError::Region(e)))?,
            None => defaults.asl_region,
        };

        let mask_threshold = helper.mask_threshold.unwrap_or(defaults.mask_threshold);
        if !(0.0..=1.0).contains(&mask_threshold) {
            return Err(D::Error::custom(ConfigError::MaskThreshold(mask_threshold)));
        }

        let detection_border = helper.detection_border.unwrap_or(defaults.detection_border);
        if detection_border < 0.0 || !detection_border.is_finite() {
            return Err(D::Error::custom(ConfigError::Border(detection_border)));
        }

        Ok(Config {
            data_dir: helper.data_dir.unwrap_or(defaults.data_dir),
            mask_filename: helper.mask_filename.unwrap_or(defaults.mask_filename),
            msl_pattern: helper.msl_pattern.unwrap_or(defaults.msl_pattern),
            msl_variable: helper.msl_variable.unwrap_or(defaults.msl_variable),
            mask_variable: helper.mask_variable.unwrap_or(defaults.mask_variable),
            asl_region,
            detection_border,
            mask_threshold,
            min_distance: helper.min_distance.unwrap_or(defaults.min_distance),
            max_lows: helper.max_lows.unwrap_or(defaults.max_lows),
            n_jobs: helper.n_jobs.unwrap_or(defaults.n_jobs),
        })
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn mask_filename(&self) -> &str {
        &self.mask_filename
    }

    pub fn msl_pattern(&self) -> &str {
        &self.msl_pattern
    }

    pub fn msl_variable(&self) -> &str {
        &self.msl_variable
    }

    pub fn mask_variable(&self) -> &str {
        &self.mask_variable
    }

    pub fn asl_region(&self) -> &Region {
        &self.asl_region
    }

    pub fn detection_border(&self) -> f64 {
        self.detection_border
    }

    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            asl_region: self.asl_region.clone(),
            mask_threshold: self.mask_threshold,
            min_distance: self.min_distance,
            max_lows: self.max_lows,
        }
    }

    pub fn set_data_dir(&mut self, data_dir: PathBuf) {
        self.data_dir = data_dir;
    }

    pub fn set_mask_filename(&mut self, mask_filename: String) {
        self.mask_filename = mask_filename;
    }

    pub fn set_msl_pattern(&mut self, msl_pattern: String) {
        self.msl_pattern = msl_pattern;
    }

    pub fn set_n_jobs(&mut self, n_jobs: usize) {
        self.n_jobs = n_jobs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();

        let config_data = r#"
    {
        "data_dir": "/tmp/asli-data",
        "msl_pattern": "monthly/*.nc",
        "asl_region": {"west": 170.0, "east": 298.0, "south": -80.0, "north": -60.0},
        "detection_border": 10.0,
        "n_jobs": 4
    }
    "#;

        file.write_all(config_data.as_bytes()).unwrap();

        let config = Config::from_file(file_path).unwrap();

        assert_eq!(config.data_dir(), Path::new("/tmp/asli-data"));
        assert_eq!(config.msl_pattern(), "monthly/*.nc");
        assert_eq!(config.detection_border(), 10.0);
        assert_eq!(config.n_jobs(), 4);

        // Unspecified fields keep their defaults
        assert_eq!(config.mask_filename(), "era5_lsm.nc");
        assert_eq!(config.detection_params().mask_threshold, 0.5);
        assert_eq!(config.detection_params().min_distance, 5);
    }

    #[test]
    fn test_invalid_region_is_rejected() {
        let bad: Result<Config, _> = serde_json::from_str(
            r#"{"asl_region": {"west": 298.0, "east": 170.0, "south": -80.0, "north": -60.0}}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_mask_threshold_must_be_a_fraction() {
        let bad: Result<Config, _> = serde_json::from_str(r#"{"mask_threshold": 1.5}"#);
        assert!(bad.is_err());

        let ok: Result<Config, _> = serde_json::from_str(r#"{"mask_threshold": 0.0}"#);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_negative_border_is_rejected() {
        let bad: Result<Config, _> = serde_json::from_str(r#"{"detection_border": -3.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let bad: Result<Config, _> = serde_json::from_str(r#"{"msl_patern": "typo/*.nc"}"#);
        assert!(bad.is_err());
    }
}
