//! Alpha Vantage market data provider.
//!
//! Endpoints used:
//! - GLOBAL_QUOTE for latest quotes
//! - OVERVIEW for fundamentals
//! - TIME_SERIES_DAILY / TIME_SERIES_INTRADAY (15min) for historical series
//!
//! The free tier allows 25 calls per day. Rate limits come back as HTTP 200
//! with a `Note` or `Information` field, which is mapped to `RateLimited`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{
    collapse_intraday, normalize_series, FundamentalSnapshot, HistoricalPoint, HistoricalRange,
    Quote,
};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_NAME: &str = "Alpha Vantage";

/// Alpha Vantage market data provider.
///
/// Priority 3, the last resort for quotes, fundamentals and history.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: Option<String>,
}

/// Common error envelope shared by every Alpha Vantage function.
#[derive(Debug, Default, Deserialize)]
struct ApiStatus {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// Response from GLOBAL_QUOTE
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
}

/// Response from OVERVIEW; every number arrives as a string
#[derive(Debug, Deserialize)]
struct CompanyOverviewResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "ForwardPE")]
    forward_pe: Option<String>,
    #[serde(rename = "DividendYield")]
    dividend_yield: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<String>,
    #[serde(rename = "Beta")]
    beta: Option<String>,
    #[serde(rename = "EPS")]
    eps: Option<String>,
}

/// Response from TIME_SERIES_DAILY / TIME_SERIES_INTRADAY.
///
/// BTreeMap keeps the ISO date keys in ascending order.
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(rename = "Time Series (Daily)")]
    daily: Option<BTreeMap<String, Bar>>,
    #[serde(rename = "Time Series (15min)")]
    intraday: Option<BTreeMap<String, Bar>>,
}

#[derive(Debug, Deserialize)]
struct Bar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider. Empty keys count as missing.
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::MissingApiKey {
                provider: PROVIDER_NAME.to_string(),
            })?;

        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_NAME.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(api_key, "***")
        );

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::Http {
                provider: PROVIDER_NAME.to_string(),
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

fn invalid(e: serde_json::Error) -> MarketDataError {
    MarketDataError::InvalidResponse {
        provider: PROVIDER_NAME.to_string(),
        message: format!("Failed to parse response: {}", e),
    }
}

/// Surface errors Alpha Vantage hides inside a 200 body.
fn check_api_error(status: &ApiStatus) -> Result<(), MarketDataError> {
    if let Some(ref msg) = status.error_message {
        if msg.contains("Invalid API call") || msg.contains("not found") {
            return Err(MarketDataError::SymbolNotFound(msg.clone()));
        }
        return Err(MarketDataError::ProviderError {
            provider: PROVIDER_NAME.to_string(),
            message: msg.clone(),
        });
    }

    // A Note is only ever sent for call-frequency limits
    if status.note.is_some() {
        return Err(MarketDataError::RateLimited {
            provider: PROVIDER_NAME.to_string(),
        });
    }

    if let Some(ref msg) = status.information {
        let lower = msg.to_lowercase();
        if lower.contains("api call frequency") || lower.contains("rate limit") {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
            });
        }
        warn!("Alpha Vantage info: {}", msg);
    }

    Ok(())
}

/// Parse a numeric string, treating "None", "-", "0" and "" as absent.
fn parse_f64(s: &Option<String>) -> Option<f64> {
    s.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "None" && *v != "-" && *v != "0")
        .and_then(|v| v.parse::<f64>().ok())
}

fn parse_number(s: &Option<String>) -> f64 {
    s.as_deref()
        .and_then(|v| v.trim().trim_end_matches('%').parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn parse_date(date_str: &str) -> Option<NaiveDate> {
    // intraday keys carry a time part: "2024-01-02 15:45:00"
    let day = date_str.split(' ').next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_global_quote(symbol: &str, body: &str) -> Result<Quote, MarketDataError> {
    let response: GlobalQuoteResponse = serde_json::from_str(body).map_err(invalid)?;
    check_api_error(&response.status)?;

    let raw = response
        .quote
        .filter(|q| q.price.is_some())
        .ok_or_else(|| {
            MarketDataError::SymbolNotFound(format!("Symbol {} not found on Alpha Vantage", symbol))
        })?;

    let price = parse_number(&raw.price);
    let reported = raw.symbol.clone().unwrap_or_else(|| symbol.to_string());
    let mut quote = Quote::new(reported, price, parse_number(&raw.previous_close), PROVIDER_NAME);
    quote.open = parse_number(&raw.open);
    quote.day_high = parse_number(&raw.high);
    quote.day_low = parse_number(&raw.low);
    quote.volume = parse_number(&raw.volume) as u64;
    Ok(quote)
}

fn parse_overview(symbol: &str, body: &str) -> Result<FundamentalSnapshot, MarketDataError> {
    let response: CompanyOverviewResponse = serde_json::from_str(body).map_err(invalid)?;
    check_api_error(&response.status)?;

    let reported = response.symbol.clone().ok_or_else(|| {
        MarketDataError::SymbolNotFound(format!("No fundamentals for {} on Alpha Vantage", symbol))
    })?;

    Ok(FundamentalSnapshot {
        symbol: reported,
        market_cap: parse_f64(&response.market_capitalization),
        pe_ratio: parse_f64(&response.pe_ratio),
        forward_pe: parse_f64(&response.forward_pe),
        dividend_yield: parse_f64(&response.dividend_yield),
        fifty_two_week_high: parse_f64(&response.week_52_high).unwrap_or(0.0),
        fifty_two_week_low: parse_f64(&response.week_52_low).unwrap_or(0.0),
        average_volume: None,
        beta: parse_f64(&response.beta),
        eps: parse_f64(&response.eps),
        provider: PROVIDER_NAME.to_string(),
    })
}

/// Maximum raw bars kept per range. Applied newest-first before folding
/// intraday bars into days.
fn bar_limit(range: HistoricalRange) -> usize {
    match range {
        HistoricalRange::OneDay => 26,
        HistoricalRange::FiveDays => 130,
        HistoricalRange::OneMonth => 22,
        HistoricalRange::ThreeMonths => 66,
        HistoricalRange::YearToDate | HistoricalRange::OneYear => 252,
        HistoricalRange::FiveYears => 1260,
        HistoricalRange::Max => 5000,
    }
}

fn parse_time_series(
    symbol: &str,
    body: &str,
    range: HistoricalRange,
    today: NaiveDate,
) -> Result<Vec<HistoricalPoint>, MarketDataError> {
    let response: TimeSeriesResponse = serde_json::from_str(body).map_err(invalid)?;
    check_api_error(&response.status)?;

    let series = if range.is_intraday() {
        response.intraday
    } else {
        response.daily
    }
    .ok_or_else(|| {
        MarketDataError::SymbolNotFound(format!("No historical data for {} on Alpha Vantage", symbol))
    })?;

    let limit = bar_limit(range);
    let skip = series.len().saturating_sub(limit);
    let bars: Vec<HistoricalPoint> = series
        .iter()
        .skip(skip)
        .filter_map(|(key, bar)| {
            let close = bar.close.trim().parse::<f64>().ok()?;
            Some(HistoricalPoint {
                date: parse_date(key)?,
                open: bar.open.trim().parse().ok(),
                high: bar.high.trim().parse().ok(),
                low: bar.low.trim().parse().ok(),
                close,
                adjusted_close: None,
                volume: bar.volume.trim().parse().ok(),
            })
        })
        .collect();

    let mut points = if range.is_intraday() {
        collapse_intraday(bars)
    } else {
        bars
    };

    if range == HistoricalRange::YearToDate {
        let start = range.start_date(today);
        points.retain(|p| p.date >= start);
    }

    if points.is_empty() {
        return Err(MarketDataError::NoDataForRange);
    }
    Ok(normalize_series(points, None))
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn priority(&self) -> u8 {
        3
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            quote: true,
            fundamentals: true,
            historical: true,
            news: false,
        }
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let body = self
            .fetch(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        parse_global_quote(symbol, &body)
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, MarketDataError> {
        let body = self
            .fetch(&[("function", "OVERVIEW"), ("symbol", symbol)])
            .await?;
        parse_overview(symbol, &body)
    }

    async fn get_historical(
        &self,
        symbol: &str,
        range: HistoricalRange,
    ) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        let output_size = match range {
            HistoricalRange::OneMonth | HistoricalRange::ThreeMonths => "compact",
            _ => "full",
        };

        let mut params = vec![("symbol", symbol), ("outputsize", output_size)];
        if range.is_intraday() {
            params.push(("function", "TIME_SERIES_INTRADAY"));
            params.push(("interval", "15min"));
        } else {
            params.push(("function", "TIME_SERIES_DAILY"));
        }

        let body = self.fetch(&params).await?;
        let points = parse_time_series(symbol, &body, range, Utc::now().date_naive())?;
        debug!(
            "Alpha Vantage: fetched {} points for {} ({})",
            points.len(),
            symbol,
            range
        );
        Ok(points)
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_none() {
            return false;
        }
        match self
            .fetch(&[("function", "GLOBAL_QUOTE"), ("symbol", "AAPL")])
            .await
        {
            Ok(body) => match serde_json::from_str::<ApiStatus>(&body) {
                Ok(status) => status.note.is_none() && status.error_message.is_none(),
                Err(_) => false,
            },
            Err(_) => false,
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
    fn test_provider_priority() {
        let provider = AlphaVantageProvider::new(Some("demo".to_string()));
        assert_eq!(provider.name(), "Alpha Vantage");
        assert_eq!(provider.priority(), 3);
        assert!(provider.capabilities().historical);
        assert!(!provider.capabilities().news);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-15"), Some(day("2024-01-15")));
        assert_eq!(parse_date("2024-01-15 15:45:00"), Some(day("2024-01-15")));
        assert_eq!(parse_date("invalid"), None);
    }

    #[test]
    fn test_parse_f64_filters_placeholders() {
        assert_eq!(parse_f64(&Some("1.5".to_string())), Some(1.5));
        assert_eq!(parse_f64(&Some("None".to_string())), None);
        assert_eq!(parse_f64(&Some("-".to_string())), None);
        assert_eq!(parse_f64(&Some("0".to_string())), None);
        assert_eq!(parse_f64(&None), None);
    }

    #[test]
    fn test_global_quote_parsing_recomputes_change() {
        let json = r#"{
            "Global Quote": {
                "01. symbol": "IBM",
                "02. open": "160.0",
                "03. high": "162.5",
                "04. low": "159.2",
                "05. price": "161.0",
                "06. volume": "3500000",
                "07. latest trading day": "2024-01-02",
                "08. previous close": "158.0",
                "09. change": "9.99",
                "10. change percent": "9.99%"
            }
        }"#;
        let quote = parse_global_quote("IBM", json).unwrap();
        assert_eq!(quote.symbol, "IBM");
        assert_eq!(quote.volume, 3_500_000);
        assert!((quote.change - 3.0).abs() < 1e-9);
        assert!((quote.change_percent - (3.0 / 158.0 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_global_quote_is_not_found() {
        let err = parse_global_quote("NOPE", r#"{"Global Quote": {}}"#).unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_note_is_rate_limit() {
        let json = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        let err = parse_global_quote("IBM", json).unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_information_rate_limit() {
        let json = r#"{"Information": "We have detected your API key and our standard API rate limit is 25 requests per day."}"#;
        let err = parse_overview("IBM", json).unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_company_overview_parsing() {
        let json = r#"{
            "Symbol": "IBM",
            "Name": "International Business Machines",
            "MarketCapitalization": "150000000000",
            "PERatio": "22.1",
            "ForwardPE": "None",
            "DividendYield": "0.041",
            "52WeekHigh": "199.18",
            "52WeekLow": "120.55",
            "Beta": "0.72",
            "EPS": "8.14"
        }"#;
        let snapshot = parse_overview("IBM", json).unwrap();
        assert_eq!(snapshot.market_cap, Some(150_000_000_000.0));
        assert_eq!(snapshot.forward_pe, None);
        assert_eq!(snapshot.fifty_two_week_low, 120.55);
        assert_eq!(snapshot.provider, "Alpha Vantage");
    }

    #[test]
    fn test_overview_without_symbol_is_not_found() {
        let err = parse_overview("NOPE", "{}").unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    fn daily_body(days: u32) -> String {
        let entries: Vec<String> = (1..=days)
            .map(|d| {
                format!(
                    r#""2024-01-{:02}": {{"1. open": "{d}.0", "2. high": "{d}.5", "3. low": "{d}.0", "4. close": "{d}.25", "5. volume": "100"}}"#,
                    d,
                    d = d
                )
            })
            .collect();
        format!(r#"{{"Time Series (Daily)": {{{}}}}}"#, entries.join(","))
    }

    #[test]
    fn test_time_series_keeps_most_recent_sorted() {
        let body = daily_body(30);
        let points =
            parse_time_series("IBM", &body, HistoricalRange::OneMonth, day("2024-02-01")).unwrap();
        assert_eq!(points.len(), 22);
        assert_eq!(points.first().unwrap().date, day("2024-01-09"));
        assert_eq!(points.last().unwrap().date, day("2024-01-30"));
        assert!(points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_intraday_bars_fold_into_days() {
        let body = r#"{"Time Series (15min)": {
            "2024-01-02 09:30:00": {"1. open": "10", "2. high": "11", "3. low": "9", "4. close": "10.5", "5. volume": "100"},
            "2024-01-02 09:45:00": {"1. open": "10.5", "2. high": "12", "3. low": "10", "4. close": "11.5", "5. volume": "50"},
            "2024-01-03 09:30:00": {"1. open": "11.5", "2. high": "11.8", "3. low": "11", "4. close": "11.2", "5. volume": "70"}
        }}"#;
        let points =
            parse_time_series("IBM", body, HistoricalRange::FiveDays, day("2024-01-03")).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].open, Some(10.0));
        assert_eq!(points[0].high, Some(12.0));
        assert_eq!(points[0].low, Some(9.0));
        assert_eq!(points[0].close, 11.5);
        assert_eq!(points[0].volume, Some(150));
    }

    #[test]
    fn test_missing_series_is_not_found() {
        let err = parse_time_series("NOPE", "{}", HistoricalRange::OneYear, day("2024-01-01"))
            .unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }
}
