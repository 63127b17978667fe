use chrono::NaiveDateTime;

use super::row::{AslRow, Candidate};
use crate::region::Region;

/// One ASL row per entry of `times`, in that order: the deepest candidate
/// strictly inside `region` for each time step, or a placeholder row when
/// none qualifies. Pressure ties keep the first-encountered candidate.
pub fn select_per_time(
    candidates: &[Candidate],
    times: &[NaiveDateTime],
    region: &Region,
) -> Vec<AslRow> {
    times
        .iter()
        .map(|&time| {
            let mut best: Option<&Candidate> = None;

            for candidate in candidates {
                if candidate.time != time
                    || !region.contains_strict(candidate.lon, candidate.lat)
                {
                    continue;
                }

                match best {
                    Some(current) if candidate.act_cen_pres >= current.act_cen_pres => {}
                    _ => best = Some(candidate),
                }
            }

            best.map(AslRow::from_candidate)
                .unwrap_or_else(|| AslRow::placeholder(time))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn time(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn candidate(day: u32, lon: f64, lat: f64, pres: f64) -> Candidate {
        Candidate::new(time(day), lon, lat, pres, Some(990.0))
    }

    #[test]
    fn test_one_row_per_time_step() {
        let region = Region::amundsen_sea();
        let candidates = vec![
            candidate(1, 200.0, -70.0, 980.0),
            candidate(1, 250.0, -75.0, 975.0),
            // day 2 has no candidates at all
            candidate(3, 40.0, -70.0, 950.0), // outside the box
        ];
        let times = vec![time(1), time(2), time(3)];

        let rows = select_per_time(&candidates, &times, &region);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].act_cen_pres, Some(975.0));
        assert_eq!(rows[1], AslRow::placeholder(time(2)));
        assert_eq!(rows[2], AslRow::placeholder(time(3)));
    }

    #[test]
    fn test_deepest_low_inside_box_wins() {
        let region = Region::amundsen_sea();
        // The deeper low sits outside the box and must lose.
        let candidates = vec![
            candidate(1, 100.0, -70.0, 940.0),
            candidate(1, 200.0, -70.0, 970.0),
        ];

        let rows = select_per_time(&candidates, &[time(1)], &region);

        assert_eq!(rows[0].lon, Some(200.0));
        assert_eq!(rows[0].act_cen_pres, Some(970.0));
    }

    #[test]
    fn test_boundary_points_are_excluded() {
        let region = Region::amundsen_sea();
        let times = vec![time(1)];

        for (lon, lat) in [
            (region.west, -70.0),
            (region.east, -70.0),
            (200.0, region.south),
            (200.0, region.north),
        ] {
            let rows = select_per_time(&[candidate(1, lon, lat, 950.0)], &times, &region);
            assert_eq!(rows[0], AslRow::placeholder(time(1)));
        }

        let just_inside = candidate(1, region.west + 1e-9, -70.0, 950.0);
        let rows = select_per_time(&[just_inside], &times, &region);
        assert_eq!(rows[0].act_cen_pres, Some(950.0));
    }

    #[test]
    fn test_pressure_tie_keeps_first_candidate() {
        let region = Region::amundsen_sea();
        let candidates = vec![
            candidate(1, 210.0, -70.0, 960.0),
            candidate(1, 250.0, -72.0, 960.0),
        ];

        let rows = select_per_time(&candidates, &[time(1)], &region);

        assert_eq!(rows[0].lon, Some(210.0));
    }

    #[test]
    fn test_rows_follow_input_time_order() {
        let region = Region::amundsen_sea();
        let candidates = vec![
            candidate(2, 200.0, -70.0, 980.0),
            candidate(1, 200.0, -70.0, 970.0),
        ];
        let times = vec![time(1), time(2)];

        let rows = select_per_time(&candidates, &times, &region);

        assert_eq!(rows[0].time, time(1));
        assert_eq!(rows[0].act_cen_pres, Some(970.0));
        assert_eq!(rows[1].time, time(2));
        assert_eq!(rows[1].act_cen_pres, Some(980.0));
    }
}
