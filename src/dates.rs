//! Calendar-date arithmetic over ISO `YYYY-MM-DD` strings.
//!
//! Dates are persisted as zero-padded ISO strings, so SQL string comparison
//! orders them correctly. In-process arithmetic goes through
//! [`chrono::NaiveDate`], which is purely civil: adding days can never be
//! skewed by daylight-saving transitions.

use crate::error::EngineError;
use crate::types::Weekday;
use chrono::{Datelike, Days, NaiveDate};

/// Parse a strict `YYYY-MM-DD` calendar date.
///
/// Rejects anything that does not round-trip to the exact input, so
/// unpadded or out-of-range values fail instead of being silently
/// normalized.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, EngineError> {
    let parsed = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| EngineError::invalid_date(field, value))?;
    if format_date(parsed) != value {
        return Err(EngineError::invalid_date(field, value));
    }
    Ok(parsed)
}

/// Format a date back to `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Shift a date by a whole number of days (negative shifts backwards).
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
    .unwrap_or(date)
}

/// Weekday symbol of a date.
pub fn weekday_of(date: NaiveDate) -> Weekday {
    Weekday::from_chrono(date.weekday())
}

/// Number of days in the inclusive range, or 0 when `end < start`.
pub fn range_len(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        0
    } else {
        (end - start).num_days() + 1
    }
}

/// Iterate the inclusive date range `start..=end`. Empty when `end < start`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let mut current = Some(start);
    std::iter::from_fn(move || {
        let d = current?;
        if d > end {
            return None;
        }
        current = d.succ_opt();
        Some(d)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn parse_accepts_valid_iso_date() {
        let d = parse_date("date", "2024-03-01").unwrap();
        assert_eq!(format_date(d), "2024-03-01");
    }

    #[test]
    fn parse_rejects_unpadded_date() {
        let err = parse_date("startDate", "2024-3-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDate);
        assert_eq!(err.field.as_deref(), Some("startDate"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_date("date", "not-a-date").is_err());
        assert!(parse_date("date", "2024-13-01").is_err());
        assert!(parse_date("date", "2024-02-30").is_err());
        assert!(parse_date("date", "").is_err());
    }

    #[test]
    fn add_days_crosses_month_and_year_boundaries() {
        let d = parse_date("date", "2024-02-28").unwrap();
        assert_eq!(format_date(add_days(d, 2)), "2024-03-01"); // leap year
        let d = parse_date("date", "2023-12-30").unwrap();
        assert_eq!(format_date(add_days(d, 3)), "2024-01-02");
    }

    #[test]
    fn add_days_negative_goes_backwards() {
        let d = parse_date("date", "2024-03-02").unwrap();
        assert_eq!(format_date(add_days(d, -7)), "2024-02-24");
    }

    #[test]
    fn weekday_of_known_dates() {
        // 2024-01-01 was a Monday
        let d = parse_date("date", "2024-01-01").unwrap();
        assert_eq!(weekday_of(d), Weekday::Monday);
        let d = parse_date("date", "2024-01-07").unwrap();
        assert_eq!(weekday_of(d), Weekday::Sunday);
    }

    #[test]
    fn date_range_is_inclusive() {
        let start = parse_date("date", "2024-01-01").unwrap();
        let end = parse_date("date", "2024-01-03").unwrap();
        let days: Vec<String> = date_range(start, end).map(format_date).collect();
        assert_eq!(days, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
    }

    #[test]
    fn date_range_empty_when_inverted() {
        let start = parse_date("date", "2024-01-05").unwrap();
        let end = parse_date("date", "2024-01-01").unwrap();
        assert_eq!(date_range(start, end).count(), 0);
        assert_eq!(range_len(start, end), 0);
    }

    #[test]
    fn range_len_counts_inclusive_days() {
        let start = parse_date("date", "2024-01-01").unwrap();
        let end = parse_date("date", "2024-01-15").unwrap();
        assert_eq!(range_len(start, end), 15);
    }
}
