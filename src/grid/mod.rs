use std::fmt;

use chrono::NaiveDateTime;
use ndarray::{Array2, ArrayView2, s};

use crate::region::Region;

pub mod season;
pub use season::season_mean;

/// Coordinate comparison tolerance when aligning grids, in degrees.
const COORD_TOLERANCE: f64 = 1e-6;

#[derive(Debug)]
pub enum GridError {
    ShapeMismatch {
        rows: usize,
        cols: usize,
        nlat: usize,
        nlon: usize,
    },
    LatitudeOrder,
    CoordMismatch(String),
    EmptySlice(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::ShapeMismatch {
                rows,
                cols,
                nlat,
                nlon,
            } => write!(
                f,
                "Grid shape {}x{} does not match coordinates {}x{}",
                rows, cols, nlat, nlon
            ),
            GridError::LatitudeOrder => {
                write!(f, "Latitudes must be strictly descending (north to south)")
            }
            GridError::CoordMismatch(msg) => write!(f, "Incompatible grids: {}", msg),
            GridError::EmptySlice(msg) => write!(f, "Region selects no grid cells: {}", msg),
        }
    }
}

impl std::error::Error for GridError {}

/// One 2-D scalar field on a regular lat/lon grid, tagged with a timestamp.
/// Rows follow `lats` (descending, north to south), columns follow `lons`.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct GridFrame {
    values: Array2<f64>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    time: NaiveDateTime,
}

impl GridFrame {
    pub fn new(
        values: Array2<f64>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        time: NaiveDateTime,
    ) -> Result<Self, GridError> {
        check_grid_shape(&values, &lats, &lons)?;

        if lats.windows(2).any(|w| w[0] <= w[1]) {
            return Err(GridError::LatitudeOrder);
        }

        Ok(GridFrame {
            values,
            lats,
            lons,
            time,
        })
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn time(&self) -> NaiveDateTime {
        self.time
    }

    /// Restrict the frame to `region`, endpoints included. The result shares
    /// no storage with `self`.
    pub fn slice(&self, region: &Region) -> Result<GridFrame, GridError> {
        let (lat_range, lon_range) = coord_ranges(&self.lats, &self.lons, region)?;

        let values = self
            .values
            .slice(s![lat_range.0..lat_range.1, lon_range.0..lon_range.1])
            .to_owned();

        Ok(GridFrame {
            values,
            lats: self.lats[lat_range.0..lat_range.1].to_vec(),
            lons: self.lons[lon_range.0..lon_range.1].to_vec(),
            time: self.time,
        })
    }
}

/// Land fraction per grid cell in [0, 1], aligned to (a superset of) the
/// pressure grid. Shared read-only across the whole run.
#[derive(Debug, Clone)]
pub struct RegionMask {
    values: Array2<f64>,
    lats: Vec<f64>,
    lons: Vec<f64>,
}

impl RegionMask {
    pub fn new(values: Array2<f64>, lats: Vec<f64>, lons: Vec<f64>) -> Result<Self, GridError> {
        check_grid_shape(&values, &lats, &lons)?;

        if lats.windows(2).any(|w| w[0] <= w[1]) {
            return Err(GridError::LatitudeOrder);
        }

        Ok(RegionMask { values, lats, lons })
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// Extract the sub-mask covering exactly the cells of `frame`. The mask
    /// may be a superset of the frame's grid; every frame coordinate must
    /// appear in the mask or the grids are declared incompatible.
    pub fn slice_to_match(&self, frame: &GridFrame) -> Result<RegionMask, GridError> {
        let lat_start = find_coord_offset(&self.lats, frame.lats(), "latitude")?;
        let lon_start = find_coord_offset(&self.lons, frame.lons(), "longitude")?;

        let nlat = frame.lats().len();
        let nlon = frame.lons().len();

        let values = self
            .values
            .slice(s![lat_start..lat_start + nlat, lon_start..lon_start + nlon])
            .to_owned();

        Ok(RegionMask {
            values,
            lats: frame.lats().to_vec(),
            lons: frame.lons().to_vec(),
        })
    }
}

fn check_grid_shape(values: &Array2<f64>, lats: &[f64], lons: &[f64]) -> Result<(), GridError> {
    let (rows, cols) = values.dim();
    if rows != lats.len() || cols != lons.len() {
        return Err(GridError::ShapeMismatch {
            rows,
            cols,
            nlat: lats.len(),
            nlon: lons.len(),
        });
    }
    Ok(())
}

/// Index ranges (half-open) selecting coordinates inside `region`, endpoints
/// included. Latitudes are descending so the northern bound comes first.
fn coord_ranges(
    lats: &[f64],
    lons: &[f64],
    region: &Region,
) -> Result<((usize, usize), (usize, usize)), GridError> {
    let lat_start = lats.iter().position(|&l| l <= region.north + COORD_TOLERANCE);
    let lat_end = lats.iter().rposition(|&l| l >= region.south - COORD_TOLERANCE);

    let lon_start = lons.iter().position(|&l| l >= region.west - COORD_TOLERANCE);
    let lon_end = lons.iter().rposition(|&l| l <= region.east + COORD_TOLERANCE);

    match (lat_start, lat_end, lon_start, lon_end) {
        (Some(i0), Some(i1), Some(j0), Some(j1)) if i0 <= i1 && j0 <= j1 => {
            Ok(((i0, i1 + 1), (j0, j1 + 1)))
        }
        _ => Err(GridError::EmptySlice(format!(
            "W:{} E:{} S:{} N:{}",
            region.west, region.east, region.south, region.north
        ))),
    }
}

/// Locate `wanted` as a contiguous run inside `available`.
fn find_coord_offset(
    available: &[f64],
    wanted: &[f64],
    axis: &str,
) -> Result<usize, GridError> {
    let Some(&first) = wanted.first() else {
        return Err(GridError::CoordMismatch(format!("empty {} axis", axis)));
    };

    let Some(start) = available
        .iter()
        .position(|&c| (c - first).abs() < COORD_TOLERANCE)
    else {
        return Err(GridError::CoordMismatch(format!(
            "{} {} not found in mask grid",
            axis, first
        )));
    };

    if start + wanted.len() > available.len() {
        return Err(GridError::CoordMismatch(format!(
            "mask {} axis too short for pressure grid",
            axis
        )));
    }

    for (k, &w) in wanted.iter().enumerate() {
        if (available[start + k] - w).abs() >= COORD_TOLERANCE {
            return Err(GridError::CoordMismatch(format!(
                "{} axes diverge at {} (mask {}, pressure {})",
                axis,
                k,
                available[start + k],
                w
            )));
        }
    }

    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use chrono::NaiveDate;
    use ndarray::array;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_frame_shape_must_match_coords() {
        let values = Array2::<f64>::zeros((2, 3));

        let ok = GridFrame::new(values.clone(), vec![-60.0, -61.0], vec![170.0, 171.0, 172.0], t0());
        assert!(ok.is_ok());

        let bad = GridFrame::new(values, vec![-60.0], vec![170.0, 171.0, 172.0], t0());
        assert!(matches!(bad, Err(GridError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_latitudes_must_descend() {
        let values = Array2::<f64>::zeros((2, 2));
        let bad = GridFrame::new(values, vec![-61.0, -60.0], vec![170.0, 171.0], t0());
        assert!(matches!(bad, Err(GridError::LatitudeOrder)));
    }

    #[test]
    fn test_slice_selects_inclusive_bounds() {
        let values = array![
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
        ];
        let frame = GridFrame::new(
            values,
            vec![-60.0, -61.0, -62.0],
            vec![170.0, 171.0, 172.0, 173.0],
            t0(),
        )
        .unwrap();

        let region = Region::new(171.0, 172.0, -61.0, -60.0).unwrap();
        let sliced = frame.slice(&region).unwrap();

        assert_eq!(sliced.lats(), &[-60.0, -61.0]);
        assert_eq!(sliced.lons(), &[171.0, 172.0]);
        assert_eq!(sliced.values()[[1, 0]], 6.0);
    }

    #[test]
    fn test_slice_outside_grid_is_an_error() {
        let frame = GridFrame::new(
            Array2::<f64>::zeros((2, 2)),
            vec![-60.0, -61.0],
            vec![170.0, 171.0],
            t0(),
        )
        .unwrap();

        let region = Region::new(10.0, 20.0, 40.0, 50.0).unwrap();
        assert!(matches!(frame.slice(&region), Err(GridError::EmptySlice(_))));
    }

    #[test]
    fn test_mask_aligns_to_frame_subset() {
        let mask = RegionMask::new(
            array![
                [0.0, 0.1, 0.2, 0.3],
                [0.4, 0.5, 0.6, 0.7],
                [0.8, 0.9, 1.0, 0.0],
            ],
            vec![-60.0, -61.0, -62.0],
            vec![170.0, 171.0, 172.0, 173.0],
        )
        .unwrap();

        let frame = GridFrame::new(
            Array2::<f64>::zeros((2, 2)),
            vec![-61.0, -62.0],
            vec![171.0, 172.0],
            t0(),
        )
        .unwrap();

        let aligned = mask.slice_to_match(&frame).unwrap();
        assert_eq!(aligned.lats(), frame.lats());
        assert_eq!(aligned.values()[[0, 0]], 0.5);
        assert_eq!(aligned.values()[[1, 1]], 1.0);
    }

    #[test]
    fn test_mask_on_different_grid_is_rejected() {
        let mask = RegionMask::new(
            Array2::<f64>::zeros((2, 2)),
            vec![-60.0, -61.0],
            vec![170.0, 171.0],
        )
        .unwrap();

        let frame = GridFrame::new(
            Array2::<f64>::zeros((2, 2)),
            vec![-60.5, -61.5],
            vec![170.0, 171.0],
            t0(),
        )
        .unwrap();

        assert!(matches!(
            mask.slice_to_match(&frame),
            Err(GridError::CoordMismatch(_))
        ));
    }
}
