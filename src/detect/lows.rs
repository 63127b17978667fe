use ndarray::Array2;

use super::DetectError;
use super::peaks::find_peaks;
use super::row::Candidate;
use crate::grid::{GridError, GridFrame, RegionMask};
use crate::region::Region;

/// Everything the per-time-step detection needs, threaded explicitly through
/// every call rather than read from process-wide defaults.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    /// Bounding box the final ASL pick must fall inside; also the sector-mean
    /// reference area.
    pub asl_region: Region,
    /// Land fraction at or above which a cell counts as land.
    pub mask_threshold: f64,
    /// Minimum peak separation, in grid cells.
    pub min_distance: usize,
    /// Cap on candidate lows per time step.
    pub max_lows: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        DetectionParams {
            asl_region: Region::amundsen_sea(),
            mask_threshold: 0.5,
            min_distance: 5,
            max_lows: 3,
        }
    }
}

/// Ocean-only mean of `frame` within `region` (endpoints included), the
/// reference pressure a low is judged against. `None` when the box contains
/// no finite ocean cell.
pub fn sector_mean(
    frame: &GridFrame,
    mask: &RegionMask,
    region: &Region,
    mask_threshold: f64,
) -> Option<f64> {
    let values = frame.values();
    let mask_values = mask.values();

    let mut sum = 0.0;
    let mut count = 0usize;

    for (i, &lat) in frame.lats().iter().enumerate() {
        if lat < region.south || lat > region.north {
            continue;
        }
        for (j, &lon) in frame.lons().iter().enumerate() {
            if lon < region.west || lon > region.east {
                continue;
            }

            let v = values[[i, j]];
            if mask_values[[i, j]] < mask_threshold && v.is_finite() {
                sum += v;
                count += 1;
            }
        }
    }

    (count > 0).then(|| sum / count as f64)
}

/// Candidate lows for one time step.
///
/// Land cells are filled with the field-wide maximum so the minima search
/// stays over ocean, the field is inverted, and peaks at or below the sector
/// mean pressure are kept. A field with no finite values yields no
/// candidates. `frame` and `mask` must already be on the same grid.
pub fn find_lows(
    frame: &GridFrame,
    mask: &RegionMask,
    params: &DetectionParams,
) -> Result<Vec<Candidate>, DetectError> {
    let values = frame.values();
    let mask_values = mask.values();

    if values.dim() != mask_values.dim() {
        let (rows, cols) = values.dim();
        return Err(GridError::ShapeMismatch {
            rows,
            cols,
            nlat: mask.lats().len(),
            nlon: mask.lons().len(),
        }
        .into());
    }

    let sector = sector_mean(frame, mask, &params.asl_region, params.mask_threshold);

    // Fill value is the maximum over the whole field, land included.
    let Some(field_max) = values
        .iter()
        .filter(|v| v.is_finite())
        .cloned()
        .reduce(f64::max)
    else {
        return Ok(Vec::new());
    };

    let (rows, cols) = values.dim();
    let mut filled = Array2::<f64>::zeros((rows, cols));
    for i in 0..rows {
        for j in 0..cols {
            let v = values[[i, j]];
            filled[[i, j]] = if mask_values[[i, j]] >= params.mask_threshold || !v.is_finite() {
                field_max
            } else {
                v
            };
        }
    }

    let inverted = filled.mapv(|v| -v);

    let threshold_abs = match sector {
        Some(s) => -s,
        None => inverted.mean().expect("filled field is non-empty"),
    };

    let minima = find_peaks(
        inverted.view(),
        params.min_distance,
        params.max_lows,
        false,
        threshold_abs,
    )?;

    let candidates = minima
        .into_iter()
        .map(|(i, j)| {
            Candidate::new(
                frame.time(),
                frame.lons()[j],
                frame.lats()[i],
                filled[[i, j]],
                sector,
            )
        })
        .collect();

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use ndarray::Array2;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn coords_5x5() -> (Vec<f64>, Vec<f64>) {
        (
            vec![-66.0, -68.0, -70.0, -72.0, -74.0],
            vec![200.0, 210.0, 220.0, 230.0, 240.0],
        )
    }

    fn ocean_mask_5x5() -> RegionMask {
        let (lats, lons) = coords_5x5();
        RegionMask::new(Array2::zeros((5, 5)), lats, lons).unwrap()
    }

    fn params() -> DetectionParams {
        DetectionParams {
            min_distance: 1,
            ..DetectionParams::default()
        }
    }

    #[test]
    fn test_single_low_in_uniform_ocean_field() {
        let (lats, lons) = coords_5x5();
        let mut values = Array2::from_elem((5, 5), 1000.0);
        values[[2, 2]] = 950.0;

        let frame = GridFrame::new(values, lats, lons, t0()).unwrap();
        let lows = find_lows(&frame, &ocean_mask_5x5(), &params()).unwrap();

        assert_eq!(lows.len(), 1);
        let low = &lows[0];
        assert_eq!(low.act_cen_pres, 950.0);
        assert_eq!(low.lon, 220.0);
        assert_eq!(low.lat, -70.0);

        // Sector mean is pulled slightly under 1000 by the single low cell.
        let sector = low.sector_pres.unwrap();
        assert_eq!(sector, (24.0 * 1000.0 + 950.0) / 25.0);
        assert!(sector < 1000.0);

        assert!(low.rel_cen_pres.unwrap() < 0.0);
        assert_eq!(low.rel_cen_pres.unwrap(), 950.0 - sector);
    }

    #[test]
    fn test_global_minimum_on_land_is_never_a_candidate() {
        let (lats, lons) = coords_5x5();
        let mut values = Array2::from_elem((5, 5), 1000.0);
        values[[1, 1]] = 900.0; // deepest, but on land
        values[[3, 3]] = 960.0;

        let mut mask_values = Array2::zeros((5, 5));
        mask_values[[1, 1]] = 1.0;
        let mask = RegionMask::new(mask_values, lats.clone(), lons.clone()).unwrap();

        let frame = GridFrame::new(values, lats, lons, t0()).unwrap();
        let lows = find_lows(&frame, &mask, &params()).unwrap();

        assert!(!lows.is_empty());
        for low in &lows {
            assert!((low.lon, low.lat) != (210.0, -68.0));
        }
        assert_eq!(lows[0].act_cen_pres, 960.0);
    }

    #[test]
    fn test_all_land_step_yields_no_candidates() {
        let (lats, lons) = coords_5x5();
        let values = Array2::from_elem((5, 5), 1000.0);
        let mask = RegionMask::new(Array2::ones((5, 5)), lats.clone(), lons.clone()).unwrap();

        let frame = GridFrame::new(values, lats, lons, t0()).unwrap();
        let lows = find_lows(&frame, &mask, &params()).unwrap();

        assert!(lows.is_empty());
    }

    #[test]
    fn test_all_nan_step_yields_no_candidates() {
        let (lats, lons) = coords_5x5();
        let values = Array2::from_elem((5, 5), f64::NAN);

        let frame = GridFrame::new(values, lats, lons, t0()).unwrap();
        let lows = find_lows(&frame, &ocean_mask_5x5(), &params()).unwrap();

        assert!(lows.is_empty());
    }

    #[test]
    fn test_lows_above_sector_mean_are_rejected() {
        let (lats, lons) = coords_5x5();
        // A dip that stays above the sector mean is not a low.
        let mut values = Array2::from_elem((5, 5), 1000.0);
        values[[2, 2]] = 999.9;
        for j in 0..5 {
            values[[0, j]] = 900.0; // drag the sector mean well below 999.9
        }

        let frame = GridFrame::new(values, lats, lons, t0()).unwrap();
        let lows = find_lows(&frame, &ocean_mask_5x5(), &params()).unwrap();

        assert!(lows.iter().all(|c| c.act_cen_pres <= c.sector_pres.unwrap()));
        assert!(!lows.iter().any(|c| c.act_cen_pres == 999.9));
    }

    #[test]
    fn test_sector_mean_skips_land_and_out_of_box_cells() {
        let (lats, lons) = coords_5x5();
        let mut values = Array2::from_elem((5, 5), 1000.0);
        values[[0, 0]] = 500.0;

        let mut mask_values = Array2::zeros((5, 5));
        mask_values[[0, 0]] = 0.9;
        let mask = RegionMask::new(mask_values, lats.clone(), lons.clone()).unwrap();
        let frame = GridFrame::new(values, lats, lons, t0()).unwrap();

        // The land cell's 500 hPa must not contaminate the mean.
        let mean = sector_mean(&frame, &mask, &Region::amundsen_sea(), 0.5).unwrap();
        assert_eq!(mean, 1000.0);

        // A box that misses the grid entirely has no mean.
        let far_box = Region::new(0.0, 10.0, 0.0, 10.0).unwrap();
        assert!(sector_mean(&frame, &mask, &far_box, 0.5).is_none());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let (lats, lons) = coords_5x5();
        let mut values = Array2::from_elem((5, 5), 1000.0);
        values[[1, 3]] = 955.0;
        values[[4, 0]] = 950.0;

        let frame = GridFrame::new(values, lats, lons, t0()).unwrap();
        let mask = ocean_mask_5x5();

        let first = find_lows(&frame, &mask, &params()).unwrap();
        for _ in 0..5 {
            assert_eq!(find_lows(&frame, &mask, &params()).unwrap(), first);
        }
    }
}
