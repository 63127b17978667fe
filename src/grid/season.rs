use chrono::{Datelike, NaiveDate, NaiveDateTime};
use ndarray::Array2;

use super::{GridError, GridFrame};

/// Quarterly means anchored at March: MAM, JJA, SON, DJF. December joins the
/// DJF quarter that starts in the same calendar year; January and February
/// join the quarter that started the previous December. Each output frame is
/// timestamped at the quarter start.
pub fn season_mean(frames: &[GridFrame]) -> Result<Vec<GridFrame>, GridError> {
    let mut groups: Vec<(NaiveDateTime, Vec<&GridFrame>)> = Vec::new();

    for frame in frames {
        let start = quarter_start(frame.time());
        match groups.iter_mut().find(|(s, _)| *s == start) {
            Some((_, members)) => members.push(frame),
            None => groups.push((start, vec![frame])),
        }
    }

    groups.sort_by_key(|(start, _)| *start);

    let mut means = Vec::with_capacity(groups.len());
    for (start, members) in groups {
        means.push(mean_of(&members, start)?);
    }

    Ok(means)
}

fn quarter_start(time: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = match time.month() {
        3..=5 => (time.year(), 3),
        6..=8 => (time.year(), 6),
        9..=11 => (time.year(), 9),
        12 => (time.year(), 12),
        _ => (time.year() - 1, 12),
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .expect("first of month is always valid")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
}

fn mean_of(members: &[&GridFrame], start: NaiveDateTime) -> Result<GridFrame, GridError> {
    let first = members[0];

    let mut sum: Array2<f64> = Array2::zeros(first.values().dim());
    for frame in members {
        if frame.lats() != first.lats() || frame.lons() != first.lons() {
            return Err(GridError::CoordMismatch(format!(
                "frames within quarter {} are on different grids",
                start.date()
            )));
        }
        sum += &frame.values();
    }
    sum /= members.len() as f64;

    GridFrame::new(sum, first.lats().to_vec(), first.lons().to_vec(), start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn frame(year: i32, month: u32, value: f64) -> GridFrame {
        GridFrame::new(
            array![[value, value], [value, value]],
            vec![-60.0, -61.0],
            vec![170.0, 171.0],
            NaiveDate::from_ymd_opt(year, month, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_quarters_anchor_at_march() {
        let frames = vec![
            frame(2020, 3, 1.0),
            frame(2020, 4, 2.0),
            frame(2020, 5, 3.0),
            frame(2020, 6, 10.0),
        ];

        let means = season_mean(&frames).unwrap();

        assert_eq!(means.len(), 2);
        assert_eq!(
            means[0].time().date(),
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
        );
        assert_eq!(means[0].values()[[0, 0]], 2.0);
        assert_eq!(means[1].values()[[0, 0]], 10.0);
    }

    #[test]
    fn test_december_starts_the_djf_quarter() {
        let frames = vec![
            frame(2019, 12, 6.0),
            frame(2020, 1, 0.0),
            frame(2020, 2, 3.0),
        ];

        let means = season_mean(&frames).unwrap();

        assert_eq!(means.len(), 1);
        assert_eq!(
            means[0].time().date(),
            NaiveDate::from_ymd_opt(2019, 12, 1).unwrap()
        );
        assert_eq!(means[0].values()[[1, 1]], 3.0);
    }

    #[test]
    fn test_mismatched_grids_within_quarter_are_rejected() {
        let other = GridFrame::new(
            array![[1.0, 1.0], [1.0, 1.0]],
            vec![-62.0, -63.0],
            vec![170.0, 171.0],
            NaiveDate::from_ymd_opt(2020, 4, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
        .unwrap();

        let frames = vec![frame(2020, 3, 1.0), other];
        assert!(matches!(
            season_mean(&frames),
            Err(GridError::CoordMismatch(_))
        ));
    }
}
