use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use gdal::{Dataset, Metadata};
use ndarray::Array2;

use super::time::TimeAxis;
use super::types::{GridSource, ReadError};
use super::utils::resolve_files;
use crate::config::Config;
use crate::grid::{GridFrame, RegionMask};

/// GDAL-backed input: ERA5 NetCDF files (one variable, many time-step bands)
/// and any other raster format GDAL understands for the mask.
pub struct GdalSource {
    data_dir: PathBuf,
    mask_filename: String,
    msl_pattern: String,
    msl_variable: String,
    mask_variable: String,
}

impl GdalSource {
    pub fn from_config(config: &Config) -> Self {
        GdalSource {
            data_dir: config.data_dir().to_path_buf(),
            mask_filename: config.mask_filename().to_string(),
            msl_pattern: config.msl_pattern().to_string(),
            msl_variable: config.msl_variable().to_string(),
            mask_variable: config.mask_variable().to_string(),
        }
    }
}

impl GridSource for GdalSource {
    fn read_msl_stack(&self) -> Result<Vec<GridFrame>, ReadError> {
        let paths = resolve_files(&self.data_dir, &self.msl_pattern)?;

        let mut frames = Vec::new();
        for path in &paths {
            frames.extend(read_pressure_frames(path, &self.msl_variable)?);
        }

        // Stable sort, then first band wins per timestamp: mixed ERA5/ERA5T
        // files repeat time steps across expver variants.
        frames.sort_by_key(GridFrame::time);
        frames.dedup_by_key(|f| f.time());

        Ok(frames)
    }

    fn read_mask(&self) -> Result<RegionMask, ReadError> {
        let paths = resolve_files(&self.data_dir, &self.mask_filename)?;
        read_mask_grid(&paths[0], &self.mask_variable)
    }
}

/// Map a file path to what GDAL should open: NetCDF files need the
/// `NETCDF:<path>:<variable>` subdataset prefix, anything else is opened
/// as-is.
pub fn gdal_dataset_path(path: &Path, variable: &str) -> String {
    if path.extension().and_then(|ext| ext.to_str()) == Some("nc") {
        format!("NETCDF:{}:{}", path.display(), variable)
    } else {
        path.display().to_string()
    }
}

/// All time steps of one pressure file, in hPa.
fn read_pressure_frames(path: &Path, variable: &str) -> Result<Vec<GridFrame>, ReadError> {
    let dataset = open_dataset(path, variable)?;
    let (lats, lons) = coordinate_vectors(&dataset, path)?;

    let units = dataset
        .metadata_item("time#units", "")
        .ok_or_else(|| ReadError::TimeAxis(format!("{}: no time#units metadata", path.display())))?;
    let time_axis = TimeAxis::parse(&units)?;

    let band_count = dataset.raster_count();
    let mut frames = Vec::with_capacity(band_count as usize);

    for band_index in 1..=band_count {
        let values = read_band(&dataset, band_index, path)?;
        let time = band_time(&dataset, band_index, &time_axis, path)?;

        // ERA5 stores mean sea level pressure in Pa
        let values = values.mapv(|v| v / 100.0);

        frames.push(GridFrame::new(values, lats.clone(), lons.clone(), time)?);
    }

    Ok(frames)
}

fn read_mask_grid(path: &Path, variable: &str) -> Result<RegionMask, ReadError> {
    let dataset = open_dataset(path, variable)?;
    let (lats, lons) = coordinate_vectors(&dataset, path)?;

    // The mask is static; a time dimension of length one squeezes to band 1.
    let values = read_band(&dataset, 1, path)?;

    Ok(RegionMask::new(values, lats, lons)?)
}

fn open_dataset(path: &Path, variable: &str) -> Result<Dataset, ReadError> {
    let gdal_path = gdal_dataset_path(path, variable);
    Dataset::open(&gdal_path).map_err(|e| ReadError::Gdal(format!("{}: {}", gdal_path, e)))
}

/// Cell-centre coordinate vectors from the dataset geotransform.
fn coordinate_vectors(dataset: &Dataset, path: &Path) -> Result<(Vec<f64>, Vec<f64>), ReadError> {
    let gt = dataset
        .geo_transform()
        .map_err(|e| ReadError::Gdal(format!("{}: {}", path.display(), e)))?;
    let (width, height) = dataset.raster_size();

    let lons = (0..width)
        .map(|j| gt[0] + (j as f64 + 0.5) * gt[1])
        .collect();
    let lats = (0..height)
        .map(|i| gt[3] + (i as f64 + 0.5) * gt[5])
        .collect();

    Ok((lats, lons))
}

fn read_band(
    dataset: &Dataset,
    band_index: usize,
    path: &Path,
) -> Result<Array2<f64>, ReadError> {
    let band = dataset
        .rasterband(band_index)
        .map_err(|e| ReadError::Gdal(format!("{}: {}", path.display(), e)))?;

    let (width, height) = dataset.raster_size();
    let buffer = band
        .read_as::<f64>((0, 0), (width, height), (width, height), None)
        .map_err(|e| ReadError::Gdal(format!("{}: {}", path.display(), e)))?;

    let scale = band.scale().unwrap_or(1.0);
    let offset = band.offset().unwrap_or(0.0);
    let missing_value = band.no_data_value();

    let data = buffer
        .data()
        .iter()
        .map(|&raw| {
            if missing_value.is_some_and(|mv| raw == mv) || !raw.is_finite() {
                f64::NAN
            } else {
                raw * scale + offset
            }
        })
        .collect();

    Array2::from_shape_vec((height, width), data)
        .map_err(|e| ReadError::Gdal(format!("{}: {}", path.display(), e)))
}

fn band_time(
    dataset: &Dataset,
    band_index: usize,
    time_axis: &TimeAxis,
    path: &Path,
) -> Result<NaiveDateTime, ReadError> {
    let band = dataset
        .rasterband(band_index)
        .map_err(|e| ReadError::Gdal(format!("{}: {}", path.display(), e)))?;

    let raw = band.metadata_item("NETCDF_DIM_time", "").ok_or_else(|| {
        ReadError::TimeAxis(format!(
            "{}: band {} has no NETCDF_DIM_time metadata",
            path.display(),
            band_index
        ))
    })?;

    let value: f64 = raw.parse().map_err(|_| {
        ReadError::TimeAxis(format!(
            "{}: band {} time coordinate '{}' is not numeric",
            path.display(),
            band_index,
            raw
        ))
    })?;

    time_axis.decode(value)
}
