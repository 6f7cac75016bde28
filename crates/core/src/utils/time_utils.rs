use chrono::NaiveDate;
use stockwatch_market_data::Clock;

/// Calendar day of `clock.now()` in UTC.
///
/// This is the single source of "today" for incremental imports and
/// performance lookbacks.
pub fn today(clock: &dyn Clock) -> NaiveDate {
    clock.now().date_naive()
}

/// Parses the date encodings found in market-data CSVs.
///
/// Accepts ISO `YYYY-MM-DD`, compact `YYYYMMDD` and German `DD.MM.YYYY`.
/// A trailing time part (`2024-01-02 00:00:00`) is ignored.
pub fn parse_market_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim().trim_matches('"');
    let day = value.split([' ', 'T']).next().unwrap_or(value);

    if day.len() == 8 && day.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(day, "%Y%m%d").ok();
    }

    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%d.%m.%Y"))
        .ok()
}
