use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::errors::ValidationError;

/// Default timezone for calendar-aligned windows.
/// Week and month boundaries are derived in this zone unless configured otherwise.
pub const DEFAULT_WINDOW_TZ: Tz = chrono_tz::UTC;

/// Default first day of a calendar week.
pub const DEFAULT_WEEK_START: Weekday = Weekday::Mon;

/// Converts epoch milliseconds from the wire into a UTC instant.
pub fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>, ValidationError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ValidationError::InvalidInput(format!("Timestamp {} is out of range", millis)))
}

/// Formats an instant as the epoch-millis string used for response map keys.
pub fn millis_key(instant: DateTime<Utc>) -> String {
    instant.timestamp_millis().to_string()
}

/// Returns the UTC instant at which `date` begins in `tz`.
///
/// A DST transition can swallow local midnight, in which case the first
/// representable hour of the day is used.
pub fn start_of_local_day(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    (0..24).find_map(|hour| {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}

/// Start of the calendar week containing `instant`, as seen in `tz`.
pub fn start_of_week(instant: DateTime<Utc>, tz: Tz, week_start: Weekday) -> Option<DateTime<Utc>> {
    let local_date = instant.with_timezone(&tz).date_naive();
    let days_back = (7 + local_date.weekday().num_days_from_monday()
        - week_start.num_days_from_monday())
        % 7;
    let first_day = local_date - Duration::days(i64::from(days_back));
    start_of_local_day(first_day, tz)
}

/// Start of the calendar month containing `instant`, as seen in `tz`.
pub fn start_of_month(instant: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let local_date = instant.with_timezone(&tz).date_naive();
    start_of_local_day(local_date.with_day(1)?, tz)
}

/// Computes `divisions` evenly spaced instants from `start` to `end` inclusive:
/// `t_i = start + (end - start) / (divisions - 1) * i`, rounded to the nearest
/// millisecond. The first sample is `start` and the last is `end`.
///
/// Callers validate `divisions >= 2` and `start <= end` beforehand.
pub fn evenly_spaced(start: DateTime<Utc>, end: DateTime<Utc>, divisions: usize) -> Vec<DateTime<Utc>> {
    if divisions < 2 {
        return vec![start];
    }
    let span = i128::from((end - start).num_milliseconds());
    let steps = (divisions - 1) as i128;

    (0..divisions)
        .map(|i| {
            let scaled = span * i as i128;
            // round half away from zero; span is non-negative here
            let offset = (2 * scaled + steps) / (2 * steps);
            start + Duration::milliseconds(offset as i64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_evenly_spaced_includes_both_ends() {
        let start = datetime_from_millis(0).unwrap();
        let end = datetime_from_millis(1000).unwrap();
        let samples = evenly_spaced(start, end, 5);
        let millis: Vec<i64> = samples.iter().map(|t| t.timestamp_millis()).collect();
        assert_eq!(millis, vec![0, 250, 500, 750, 1000]);
    }

    #[test]
    fn test_evenly_spaced_rounds_to_nearest_millisecond() {
        let start = datetime_from_millis(0).unwrap();
        let end = datetime_from_millis(10).unwrap();
        let millis: Vec<i64> = evenly_spaced(start, end, 4)
            .iter()
            .map(|t| t.timestamp_millis())
            .collect();
        // 10 / 3 = 3.33.., 6.66.., 10
        assert_eq!(millis, vec![0, 3, 7, 10]);
    }

    #[test]
    fn test_week_starts_on_configured_day() {
        // 2024-05-16 is a Thursday
        let instant = at(2024, 5, 16, 15);
        let monday = start_of_week(instant, chrono_tz::UTC, Weekday::Mon).unwrap();
        assert_eq!(monday, at(2024, 5, 13, 0));

        let sunday = start_of_week(instant, chrono_tz::UTC, Weekday::Sun).unwrap();
        assert_eq!(sunday, at(2024, 5, 12, 0));

        let thursday = start_of_week(instant, chrono_tz::UTC, Weekday::Thu).unwrap();
        assert_eq!(thursday, at(2024, 5, 16, 0));
    }

    #[test]
    fn test_month_start_respects_timezone() {
        // 2024-06-01 02:00 UTC is still May 31st in New York
        let instant = at(2024, 6, 1, 2);
        let utc_start = start_of_month(instant, chrono_tz::UTC).unwrap();
        assert_eq!(utc_start, at(2024, 6, 1, 0));

        let ny_start = start_of_month(instant, chrono_tz::America::New_York).unwrap();
        // May 1st 00:00 EDT is 04:00 UTC
        assert_eq!(ny_start, at(2024, 5, 1, 4));
    }

    #[test]
    fn test_out_of_range_millis_rejected() {
        assert!(datetime_from_millis(i64::MAX).is_err());
    }
}
