//! Utility functions for SQLite storage operations.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::warn;

/// Bound parameters allowed in one statement.
///
/// Matches SQLite's historical SQLITE_MAX_VARIABLE_NUMBER default, which
/// older system libraries still enforce.
pub const SQLITE_MAX_VARIABLES: usize = 999;

/// Rows per multi-row INSERT so that `columns` parameters per row stay
/// under [`SQLITE_MAX_VARIABLES`].
pub fn rows_per_statement(columns: usize) -> usize {
    (SQLITE_MAX_VARIABLES / columns.max(1)).max(1)
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string
/// comparison in SQL orders them correctly.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Unreadable stored timestamp '{}': {}", value, e);
            DateTime::<Utc>::UNIX_EPOCH
        })
}

pub fn format_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rows_per_statement() {
        assert_eq!(rows_per_statement(10), 99);
        assert_eq!(rows_per_statement(0), SQLITE_MAX_VARIABLES);
        assert_eq!(rows_per_statement(5000), 1);
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let (a, b) = (format_timestamp(&early), format_timestamp(&late));
        assert_eq!(a, "2024-03-01T09:05:00.000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&a), early);
    }

    #[test]
    fn test_unreadable_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(format_date(&date), "2024-01-02");
        assert_eq!(parse_date("2024-01-02"), Some(date));
        assert_eq!(parse_date("02.01.2024"), None);
    }
}
