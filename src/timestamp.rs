//! Millisecond timestamps in the local calendar.

use crate::types::{SqlDateStruct, SqlTimeStruct, SqlTimestampStruct};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

const TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn local_datetime(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).earliest()
}

fn millis_of(naive: NaiveDateTime) -> Option<i64> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// `YYYY-MM-DD HH:MM:SS.fff`
pub fn format_millis(ms: i64) -> Option<String> {
    local_datetime(ms).map(|dt| dt.format(TEXT_FORMAT).to_string())
}

pub fn to_struct(ms: i64) -> Option<SqlTimestampStruct> {
    let dt = local_datetime(ms)?;
    Some(SqlTimestampStruct {
        year: i16::try_from(dt.year()).ok()?,
        month: dt.month() as u16,
        day: dt.day() as u16,
        hour: dt.hour() as u16,
        minute: dt.minute() as u16,
        second: dt.second() as u16,
        fraction: dt.nanosecond() % 1_000_000_000,
    })
}

pub fn from_struct(ts: &SqlTimestampStruct) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(ts.year as i32, ts.month as u32, ts.day as u32)?;
    let time = NaiveTime::from_hms_nano_opt(
        ts.hour as u32,
        ts.minute as u32,
        ts.second as u32,
        ts.fraction,
    )?;
    millis_of(date.and_time(time))
}

pub fn from_date(d: &SqlDateStruct) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(d.year as i32, d.month as u32, d.day as u32)?;
    millis_of(date.and_time(NaiveTime::MIN))
}

/// A bare time of day lands on the current local date.
pub fn from_time(t: &SqlTimeStruct) -> Option<i64> {
    let time = NaiveTime::from_hms_opt(t.hour as u32, t.minute as u32, t.second as u32)?;
    millis_of(Local::now().date_naive().and_time(time))
}

/// Accepts an integer millisecond count, `YYYY-MM-DD[ HH:MM:SS[.fff]]`
/// or the same with a `T` separator.
pub fn parse(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(ms) = text.parse::<i64>() {
        return Some(ms);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return millis_of(naive);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| millis_of(d.and_time(NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        let ms = parse("2021-03-04 05:06:07.089").unwrap();
        assert_eq!(format_millis(ms).unwrap(), "2021-03-04 05:06:07.089");
    }

    #[test]
    fn integer_text_is_raw_millis() {
        assert_eq!(parse(" 1614834367089 "), Some(1614834367089));
    }

    #[test]
    fn date_only_is_midnight() {
        let ms = parse("2020-01-31").unwrap();
        let ts = to_struct(ms).unwrap();
        assert_eq!((ts.year, ts.month, ts.day), (2020, 1, 31));
        assert_eq!((ts.hour, ts.minute, ts.second, ts.fraction), (0, 0, 0, 0));
    }

    #[test]
    fn struct_fraction_is_nanoseconds() {
        let ms = parse("2019-12-31 23:59:58.250").unwrap();
        let ts = to_struct(ms).unwrap();
        assert_eq!(ts.fraction, 250_000_000);
        assert_eq!(from_struct(&ts), Some(ms));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse("yesterday"), None);
        assert_eq!(parse("2020-13-01"), None);
    }

    #[test]
    fn out_of_calendar_range() {
        assert!(format_millis(i64::MAX).is_none());
        assert!(to_struct(i64::MIN).is_none());
    }
}
