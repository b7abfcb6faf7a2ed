//! 日期参数解析
//!
//! Date bounds are given as whole days and compared against Unix-millis
//! timestamps, so a parsed date becomes local midnight of that day.

use super::error::{CheckerError, CheckerResult};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use shared::error::ErrorCode;

/// Accepted input formats, tried in order
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// Parse `M/D/YYYY` (US short form) or `YYYY-MM-DD`
pub fn parse_date(input: &str) -> CheckerResult<NaiveDate> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            CheckerError::configuration(
                ErrorCode::InvalidDate,
                format!("Invalid date '{}': expected mm/dd/yyyy or yyyy-mm-dd", trimmed),
            )
        })
}

/// 本地零点 → Unix 毫秒
pub fn local_midnight_millis(date: NaiveDate) -> i64 {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.timestamp_millis(),
        // DST gap at midnight: fall back to UTC midnight
        None => Utc.from_utc_datetime(&midnight).timestamp_millis(),
    }
}

/// Parse a date argument straight into a millisecond bound
pub fn parse_date_bound(input: &str) -> CheckerResult<i64> {
    parse_date(input).map(local_midnight_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_us_short_date() {
        let date = parse_date("2/20/2013").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2013, 2, 20).unwrap());
    }

    #[test]
    fn test_parse_iso_date() {
        let date = parse_date(" 2024-01-31 ").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_parse_invalid_date() {
        let err = parse_date("20.02.2013").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidDate);
    }

    #[test]
    fn test_bounds_are_ordered() {
        let earlier = parse_date_bound("1/1/2020").unwrap();
        let later = parse_date_bound("2020-01-02").unwrap();
        assert!(earlier < later);
    }
}
