//! Market-data CSV parsing (Yahoo and Stooq download formats).
//!
//! Yahoo: `Date,Open,High,Low,Close,Adj Close,Volume`
//! Stooq: `Date,Open,High,Low,Close,Volume`, dates may be `YYYYMMDD`.
//! Rows without a parseable close are dropped.

use log::warn;
use stockwatch_market_data::{normalize_series, HistoricalPoint};

use super::historical_model::{CsvSource, DateRange, MarketCsvParseResult};
use crate::errors::{Error, Result};
use crate::utils::csv_utils::{normalize_text, parse_csv_line};
use crate::utils::time_utils::parse_market_date;

/// Picks the dialect from the header line.
pub fn detect_csv_source(content: &str) -> CsvSource {
    let header = content
        .trim_start_matches('\u{feff}')
        .lines()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    if header.contains("adj close") {
        CsvSource::Yahoo
    } else if header.contains("date") && header.contains("close") && !header.contains("adj") {
        CsvSource::Stooq
    } else {
        CsvSource::Unknown
    }
}

fn optional_price(value: Option<&String>) -> Option<f64> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && *v != "null")
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn optional_volume(value: Option<&String>) -> Option<u64> {
    let v = value.map(|v| v.trim()).filter(|v| !v.is_empty() && *v != "null")?;
    v.parse::<u64>()
        .ok()
        .or_else(|| v.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// Column positions of one dialect.
struct Layout {
    name: &'static str,
    adjusted_close: Option<usize>,
    volume: usize,
}

const YAHOO_LAYOUT: Layout = Layout {
    name: "Yahoo",
    adjusted_close: Some(5),
    volume: 6,
};

const STOOQ_LAYOUT: Layout = Layout {
    name: "Stooq",
    adjusted_close: None,
    volume: 5,
};

fn parse_rows(content: &str, layout: &Layout) -> Vec<HistoricalPoint> {
    let mut points = Vec::new();

    for (i, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_line(line, b',');

        let Some(date) = fields.first().and_then(|d| parse_market_date(d)) else {
            warn!("{} CSV row {}: invalid date, skipping", layout.name, i);
            continue;
        };
        let Some(close) = optional_price(fields.get(4)) else {
            warn!("{} CSV row {}: no close price, skipping", layout.name, i);
            continue;
        };

        points.push(HistoricalPoint {
            date,
            open: optional_price(fields.get(1)),
            high: optional_price(fields.get(2)),
            low: optional_price(fields.get(3)),
            close,
            adjusted_close: layout.adjusted_close.and_then(|idx| optional_price(fields.get(idx))),
            volume: optional_volume(fields.get(layout.volume)),
        });
    }

    normalize_series(points, None)
}

/// Parses a Yahoo download. The header must name `Date` and `Close`.
pub fn parse_yahoo_csv(content: &str) -> Result<Vec<HistoricalPoint>> {
    let content = normalize_text(content);
    let header = content.lines().next().unwrap_or_default();
    if !header.contains("Date") || !header.contains("Close") {
        return Err(Error::Import("Invalid Yahoo Finance CSV format".to_string()));
    }
    Ok(parse_rows(&content, &YAHOO_LAYOUT))
}

/// Parses a Stooq download. Header matching is case-insensitive.
pub fn parse_stooq_csv(content: &str) -> Result<Vec<HistoricalPoint>> {
    let content = normalize_text(content);
    let header = content.lines().next().unwrap_or_default().to_lowercase();
    if !header.contains("date") || !header.contains("close") {
        return Err(Error::Import("Invalid Stooq CSV format".to_string()));
    }
    Ok(parse_rows(&content, &STOOQ_LAYOUT))
}

/// Parses a market-data CSV, detecting the dialect unless `force` is given.
///
/// An undetectable header is tried as Yahoo, then as Stooq. A file neither
/// accepts yields an empty result.
pub fn parse_market_csv(content: &str, force: Option<CsvSource>) -> MarketCsvParseResult {
    let content = content.trim();
    let source = force.unwrap_or_else(|| detect_csv_source(content));

    let parsed = match source {
        CsvSource::Yahoo => parse_yahoo_csv(content),
        CsvSource::Stooq => parse_stooq_csv(content),
        CsvSource::Unknown => parse_yahoo_csv(content).or_else(|_| parse_stooq_csv(content)),
    };

    let data = parsed.unwrap_or_else(|e| {
        warn!("Could not parse market CSV: {}", e);
        Vec::new()
    });

    MarketCsvParseResult {
        source,
        row_count: data.len(),
        date_range: DateRange::of(&data),
        data,
    }
}
