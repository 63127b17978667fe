use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use super::types::ReadError;

/// CF-style time axis: a counting unit plus a reference epoch, e.g.
/// `hours since 1900-01-01 00:00:00.0` as carried by the ERA5 NetCDF files.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    unit: TimeUnit,
    epoch: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TimeUnit {
    Seconds,
    Hours,
    Days,
}

impl TimeAxis {
    pub fn parse(units: &str) -> Result<TimeAxis, ReadError> {
        let mut parts = units.splitn(3, ' ');

        let unit = match parts.next() {
            Some("seconds") => TimeUnit::Seconds,
            Some("hours") => TimeUnit::Hours,
            Some("days") => TimeUnit::Days,
            _ => {
                return Err(ReadError::TimeAxis(format!(
                    "unsupported time unit in '{}'",
                    units
                )));
            }
        };

        if parts.next() != Some("since") {
            return Err(ReadError::TimeAxis(format!(
                "expected '<unit> since <epoch>', got '{}'",
                units
            )));
        }

        let Some(epoch_str) = parts.next() else {
            return Err(ReadError::TimeAxis(format!("missing epoch in '{}'", units)));
        };

        let epoch = parse_epoch(epoch_str.trim())
            .ok_or_else(|| ReadError::TimeAxis(format!("unparseable epoch '{}'", epoch_str)))?;

        Ok(TimeAxis { unit, epoch })
    }

    /// Convert a raw coordinate value into a timestamp. Fractional values are
    /// resolved at second precision.
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime, ReadError> {
        if !value.is_finite() {
            return Err(ReadError::TimeAxis(format!(
                "non-finite time coordinate {}",
                value
            )));
        }

        let seconds = match self.unit {
            TimeUnit::Seconds => value,
            TimeUnit::Hours => value * 3600.0,
            TimeUnit::Days => value * 86400.0,
        };

        self.epoch
            .checked_add_signed(Duration::seconds(seconds.round() as i64))
            .ok_or_else(|| ReadError::TimeAxis(format!("time coordinate {} overflows", value)))
    }
}

fn parse_epoch(s: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}
