use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// One daily bar of a historical series.
///
/// This is the canonical row produced by every CSV parser and every
/// historical adapter. `close` is the only required price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPoint {
    /// Calendar day, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub adjusted_close: Option<f64>,
    pub volume: Option<u64>,
}

impl HistoricalPoint {
    /// Point with only a close price.
    pub fn close_only(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            adjusted_close: None,
            volume: None,
        }
    }
}

/// Sort a series ascending by date, keep the last row seen for a duplicated
/// date, and drop the oldest points beyond `cap`.
///
/// Every adapter funnels its output through here, so the truncation policy
/// under an upstream size cap is the same everywhere: the most recent `cap`
/// points survive.
pub fn normalize_series(points: Vec<HistoricalPoint>, cap: Option<usize>) -> Vec<HistoricalPoint> {
    let mut points = points;
    // stable sort keeps input order among equal dates
    points.sort_by_key(|p| p.date);

    let mut deduped: Vec<HistoricalPoint> = Vec::with_capacity(points.len());
    for point in points {
        match deduped.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => deduped.push(point),
        }
    }

    if let Some(cap) = cap {
        if deduped.len() > cap {
            deduped.drain(..deduped.len() - cap);
        }
    }
    deduped
}

/// Fold chronologically ordered intraday bars into one bar per day.
///
/// Open comes from the first bar of the day, close from the last; high and
/// low are the extremes and volume is summed.
pub fn collapse_intraday(bars: Vec<HistoricalPoint>) -> Vec<HistoricalPoint> {
    let mut days: Vec<HistoricalPoint> = Vec::new();
    for bar in bars {
        match days.last_mut() {
            Some(day) if day.date == bar.date => {
                day.open = day.open.or(bar.open);
                day.high = max_opt(day.high, bar.high);
                day.low = min_opt(day.low, bar.low);
                day.close = bar.close;
                day.adjusted_close = bar.adjusted_close.or(day.adjusted_close);
                day.volume = match (day.volume, bar.volume) {
                    (Some(a), Some(b)) => Some(a + b),
                    (a, b) => a.or(b),
                };
            }
            _ => days.push(bar),
        }
    }
    days
}

fn max_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn min_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Range token accepted by historical requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoricalRange {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "max")]
    Max,
}

impl HistoricalRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::YearToDate => "ytd",
            Self::OneYear => "1y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }

    /// True for ranges served from intraday bars upstream.
    pub fn is_intraday(&self) -> bool {
        matches!(self, Self::OneDay | Self::FiveDays)
    }

    /// First calendar day covered by this range, counted back from `today`.
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        let back = match self {
            Self::OneDay => today.checked_sub_days(Days::new(1)),
            Self::FiveDays => today.checked_sub_days(Days::new(5)),
            Self::OneMonth => today.checked_sub_months(Months::new(1)),
            Self::ThreeMonths => today.checked_sub_months(Months::new(3)),
            Self::YearToDate => NaiveDate::from_ymd_opt(today.year(), 1, 1),
            Self::OneYear => today.checked_sub_months(Months::new(12)),
            Self::FiveYears => today.checked_sub_months(Months::new(60)),
            Self::Max => NaiveDate::from_ymd_opt(2000, 1, 1),
        };
        back.unwrap_or(NaiveDate::MIN)
    }
}

impl Default for HistoricalRange {
    fn default() -> Self {
        Self::OneYear
    }
}

impl fmt::Display for HistoricalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoricalRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(Self::OneDay),
            "5d" => Ok(Self::FiveDays),
            "1mo" | "1m" => Ok(Self::OneMonth),
            "3mo" | "3m" => Ok(Self::ThreeMonths),
            "ytd" => Ok(Self::YearToDate),
            "1y" => Ok(Self::OneYear),
            "5y" => Ok(Self::FiveYears),
            "max" => Ok(Self::Max),
            other => Err(format!("Unknown range: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_normalize_sorts_ascending() {
        let points = vec![
            HistoricalPoint::close_only(day("2024-01-03"), 3.0),
            HistoricalPoint::close_only(day("2024-01-01"), 1.0),
            HistoricalPoint::close_only(day("2024-01-02"), 2.0),
        ];
        let out = normalize_series(points, None);
        let closes: Vec<f64> = out.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_normalize_keeps_most_recent_under_cap() {
        let points = (1..=10)
            .map(|d| HistoricalPoint::close_only(day(&format!("2024-01-{:02}", d)), d as f64))
            .collect();
        let out = normalize_series(points, Some(3));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].date, day("2024-01-08"));
        assert_eq!(out[2].date, day("2024-01-10"));
    }

    #[test]
    fn test_normalize_last_duplicate_wins() {
        let points = vec![
            HistoricalPoint::close_only(day("2024-01-02"), 1.0),
            HistoricalPoint::close_only(day("2024-01-02"), 5.0),
        ];
        let out = normalize_series(points, None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].close, 5.0);
    }

    #[test]
    fn test_point_serializes_iso_date() {
        let json = serde_json::to_value(HistoricalPoint::close_only(day("2024-01-02"), 1.5)).unwrap();
        assert_eq!(json["date"], "2024-01-02");
        assert!(json.get("adjustedClose").is_some());
    }

    #[test]
    fn test_range_parse_and_display() {
        assert_eq!("3mo".parse::<HistoricalRange>().unwrap(), HistoricalRange::ThreeMonths);
        assert_eq!("1M".parse::<HistoricalRange>().unwrap(), HistoricalRange::OneMonth);
        assert!("2w".parse::<HistoricalRange>().is_err());
        assert_eq!(HistoricalRange::Max.to_string(), "max");
    }

    #[test]
    fn test_range_start_dates() {
        let today = day("2024-03-31");
        assert_eq!(HistoricalRange::OneMonth.start_date(today), day("2024-02-29"));
        assert_eq!(HistoricalRange::YearToDate.start_date(today), day("2024-01-01"));
        assert_eq!(HistoricalRange::OneYear.start_date(today), day("2023-03-31"));
        assert_eq!(HistoricalRange::Max.start_date(today), day("2000-01-01"));
    }
}
