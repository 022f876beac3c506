//! Timestamp resolution
//!
//! Exports carry time in one of several shapes: a full date-time in a `date`,
//! `timestamp` or `ISO8601` column, a calendar date and a wall-clock time split
//! across `date` and `timestamp`, or a Unix epoch. Naive values are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::types::PointRecord;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Plausible epoch seconds: 2001-09-09 up to 5138-11-16
const EPOCH_SECONDS_RANGE: std::ops::Range<f64> = 1e9..1e11;
/// The same window in milliseconds
const EPOCH_MILLIS_RANGE: std::ops::Range<f64> = 1e12..1e14;

/// Parse a full date-time (with or without offset)
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse a calendar date
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a wall-clock time of day
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Parse a Unix epoch in seconds or milliseconds.
///
/// Small numbers such as sample counters or elapsed seconds are not instants
/// and yield `None`.
pub fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let value: f64 = raw.trim().parse().ok()?;
    let millis = if EPOCH_SECONDS_RANGE.contains(&value) {
        value * 1000.0
    } else if EPOCH_MILLIS_RANGE.contains(&value) {
        value
    } else {
        return None;
    };
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

/// Resolve the instant a point was sampled at, if any of its time columns allow it.
///
/// Order: full date-times (`iso8601`, `date`, `timestamp`), then `date` +
/// time-of-day `timestamp`, then epoch `timestamp`, then a bare date at midnight.
pub fn resolve_instant(point: &PointRecord) -> Option<DateTime<Utc>> {
    let iso = point.iso8601.as_deref();
    let date = point.date.as_deref();
    let ts = point.timestamp.as_deref();

    [iso, date, ts]
        .into_iter()
        .flatten()
        .find_map(parse_datetime)
        .or_else(|| {
            let day = parse_date(date?)?;
            let time = parse_time(ts?)?;
            Some(Utc.from_utc_datetime(&day.and_time(time)))
        })
        .or_else(|| ts.and_then(parse_epoch))
        .or_else(|| {
            [date, iso]
                .into_iter()
                .flatten()
                .find_map(parse_date)
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn point(date: Option<&str>, ts: Option<&str>, iso: Option<&str>) -> PointRecord {
        PointRecord {
            date: date.map(str::to_string),
            timestamp: ts.map(str::to_string),
            iso8601: iso.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 7, 30, 15).unwrap();
        assert_eq!(parse_datetime("2024-05-01T07:30:15Z"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01 07:30:15"), Some(expected));
        assert_eq!(parse_datetime("01.05.2024 07:30:15"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01 09:30:15+02:00"), Some(expected));
        assert_eq!(
            parse_datetime("2024-05-01T07:30:15.500").map(|d| d.nanosecond()),
            Some(500_000_000)
        );
        assert_eq!(parse_datetime("yesterday"), None);
        assert_eq!(parse_datetime(""), None);
    }

    #[test]
    fn test_parse_epoch() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 7, 30, 15).unwrap();
        assert_eq!(parse_epoch("1714548615"), Some(expected));
        assert_eq!(parse_epoch("1714548615000"), Some(expected));
        assert_eq!(parse_epoch("-5"), None);
        assert_eq!(parse_epoch("abc"), None);
        assert_eq!(parse_epoch("NaN"), None);
    }

    #[test]
    fn test_counters_are_not_epochs() {
        for raw in ["0", "1", "1800", "86400", "999999999", "5e11"] {
            assert_eq!(parse_epoch(raw), None, "{raw}");
        }

        // a bare date with a counter column stays at the date, not 1970
        let midnight = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        for counter in ["1", "1800"] {
            let p = point(Some("2024-05-01"), Some(counter), None);
            assert_eq!(resolve_instant(&p), Some(midnight), "{counter}");
        }
    }

    #[test]
    fn test_resolve_prefers_full_datetime() {
        let p = point(
            Some("2024-05-01 07:00:00"),
            Some("1"),
            Some("2024-05-01T08:00:00Z"),
        );
        assert_eq!(
            resolve_instant(&p),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_resolve_split_date_and_time() {
        let p = point(Some("01.05.2024"), Some("07:45:10"), None);
        assert_eq!(
            resolve_instant(&p),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 7, 45, 10).unwrap())
        );
    }

    #[test]
    fn test_resolve_epoch_and_bare_date() {
        let p = point(None, Some("1714548615"), None);
        assert_eq!(
            resolve_instant(&p),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 7, 30, 15).unwrap())
        );

        let p = point(Some("2024-05-01"), None, None);
        assert_eq!(
            resolve_instant(&p),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );

        assert_eq!(resolve_instant(&point(None, None, None)), None);
        assert_eq!(resolve_instant(&point(Some("soon"), Some("later"), None)), None);
    }
}
