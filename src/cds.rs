use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

use crate::region::Region;

const DEFAULT_API_URL: &str = "https://cds.climate.copernicus.eu/api/v2";
const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum DownloadError {
    Credentials(String),
    Http(reqwest::Error),
    Api(String),
    Io(std::io::Error),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Credentials(msg) => write!(f, "CDS credentials: {}", msg),
            DownloadError::Http(e) => write!(f, "HTTP error: {}", e),
            DownloadError::Api(msg) => write!(f, "CDS request failed: {}", msg),
            DownloadError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> DownloadError {
        DownloadError::Http(err)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> DownloadError {
        DownloadError::Io(err)
    }
}

/// One retrieval from the climate archive: a dataset name, the request body,
/// and where the result lands relative to the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct CdsRequest {
    pub dataset: String,
    pub body: Value,
    pub target: PathBuf,
}

/// The seam the rest of the system consumes. Queueing and retry policy live
/// behind implementations of this trait, not in the detection core.
pub trait DataAcquirer {
    fn retrieve(&self, request: &CdsRequest, data_dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// Bounding area for a CDS request in the API's `[N, W, S, E]` order,
/// optionally widened by `border` degrees on every side. `None` region means
/// whole earth.
pub fn request_area(region: Option<&Region>, border: Option<f64>) -> Option<[f64; 4]> {
    let region = region?;

    let area = match border {
        Some(b) => region.with_border(b),
        None => region.clone(),
    };

    Some([area.north, area.west, area.south, area.east])
}

/// Monthly-averaged ERA5 single-level fields for the given years. `vars`
/// holds the short names msl, tas, uas and vas; unknown names are ignored.
pub fn era5_monthly_request(
    vars: &[String],
    start_year: i32,
    end_year: i32,
    area: Option<[f64; 4]>,
) -> CdsRequest {
    let variables: Vec<&str> = [
        ("uas", "10m_u_component_of_wind"),
        ("vas", "10m_v_component_of_wind"),
        ("tas", "2m_temperature"),
        ("msl", "mean_sea_level_pressure"),
    ]
    .iter()
    .filter(|(short, _)| vars.iter().any(|v| v == short))
    .map(|&(_, long)| long)
    .collect();

    let years: Vec<String> = (start_year..=end_year).map(|y| y.to_string()).collect();
    let months: Vec<String> = (1..=12).map(|m| format!("{:02}", m)).collect();

    let mut body = json!({
        "format": "netcdf",
        "product_type": "monthly_averaged_reanalysis",
        "variable": variables,
        "year": years,
        "month": months,
        "time": "00:00",
    });

    if let Some(area) = area {
        body["area"] = json!(area);
    }

    CdsRequest {
        dataset: "reanalysis-era5-single-levels-monthly-means".to_string(),
        body,
        target: PathBuf::from(format!(
            "ERA5/monthly/era5_{}_monthly_{}-{}.nc",
            variables.join("_"),
            start_year,
            end_year
        )),
    }
}

/// The static ERA5 land-sea mask, one arbitrary month.
pub fn land_sea_mask_request(filename: &str, area: Option<[f64; 4]>) -> CdsRequest {
    let mut body = json!({
        "format": "netcdf",
        "product_type": "monthly_averaged_reanalysis",
        "variable": "land_sea_mask",
        "year": "2023",
        "month": "12",
        "time": "00:00",
    });

    if let Some(area) = area {
        body["area"] = json!(area);
    }

    CdsRequest {
        dataset: "reanalysis-era5-single-levels-monthly-means".to_string(),
        body,
        target: PathBuf::from(filename),
    }
}

/// Minimal blocking client for the CDS API: submit the request, poll the
/// task until it completes, stream the result to the target file. Requires
/// a CDS account; credentials come from `CDSAPI_KEY` (`uid:key`) with the
/// endpoint overridable through `CDSAPI_URL`.
pub struct CdsClient {
    base_url: String,
    uid: String,
    key: String,
    http: reqwest::blocking::Client,
}

impl CdsClient {
    pub fn from_env() -> Result<Self, DownloadError> {
        let base_url =
            std::env::var("CDSAPI_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let raw_key = std::env::var("CDSAPI_KEY").map_err(|_| {
            DownloadError::Credentials("CDSAPI_KEY environment variable not set".to_string())
        })?;

        let Some((uid, key)) = raw_key.split_once(':') else {
            return Err(DownloadError::Credentials(
                "CDSAPI_KEY must have the form uid:key".to_string(),
            ));
        };

        Ok(CdsClient {
            base_url,
            uid: uid.to_string(),
            key: key.to_string(),
            http: reqwest::blocking::Client::new(),
        })
    }

    fn poll_task(&self, request_id: &str) -> Result<String, DownloadError> {
        loop {
            let reply: Value = self
                .http
                .get(format!("{}/tasks/{}", self.base_url, request_id))
                .basic_auth(&self.uid, Some(&self.key))
                .send()?
                .error_for_status()?
                .json()?;

            match reply["state"].as_str() {
                Some("completed") => {
                    let location = reply["location"].as_str().ok_or_else(|| {
                        DownloadError::Api("completed task has no result location".to_string())
                    })?;
                    return Ok(location.to_string());
                }
                Some("queued") | Some("running") => {
                    log::info!("CDS request {} is {}", request_id, reply["state"]);
                    thread::sleep(POLL_INTERVAL);
                }
                state => {
                    return Err(DownloadError::Api(format!(
                        "task {} entered state {:?}: {}",
                        request_id, state, reply["error"]
                    )));
                }
            }
        }
    }
}

impl DataAcquirer for CdsClient {
    fn retrieve(&self, request: &CdsRequest, data_dir: &Path) -> Result<PathBuf, DownloadError> {
        let submit_url = format!("{}/resources/{}", self.base_url, request.dataset);

        let reply: Value = self
            .http
            .post(&submit_url)
            .basic_auth(&self.uid, Some(&self.key))
            .json(&request.body)
            .send()?
            .error_for_status()?
            .json()?;

        let request_id = reply["request_id"].as_str().ok_or_else(|| {
            DownloadError::Api(format!("no request_id in CDS reply: {}", reply))
        })?;
        log::info!("submitted CDS request {} for {}", request_id, request.dataset);

        let location = self.poll_task(request_id)?;

        let output_path = data_dir.join(&request.target);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut response = self
            .http
            .get(&location)
            .basic_auth(&self.uid, Some(&self.key))
            .send()?
            .error_for_status()?;
        let mut file = File::create(&output_path)?;
        std::io::copy(&mut response, &mut file)?;

        log::info!("downloaded {} to {}", location, output_path.display());
        Ok(output_path)
    }
}
