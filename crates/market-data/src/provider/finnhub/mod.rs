//! Finnhub market data provider implementation.
//!
//! This module provides market data from the Finnhub API:
//! - Latest quotes via /quote
//! - Fundamental metrics via /stock/metric
//! - Company news via /company-news
//!
//! Finnhub has no historical endpoint on the free tier, so the historical
//! capability is not advertised. Free tier is limited to 60 calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{FundamentalSnapshot, NewsArticle, Quote};
use crate::provider::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_NAME: &str = "Finnhub";

/// Lookback window for company news.
const NEWS_LOOKBACK_DAYS: u64 = 7;
/// Upper bound on articles returned per symbol.
const MAX_NEWS_ITEMS: usize = 20;

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close
    pc: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
    // d and dp exist but change is always derived from c and pc
}

/// Response from /stock/metric endpoint
#[derive(Debug, Deserialize)]
struct MetricResponse {
    #[serde(default)]
    metric: HashMap<String, serde_json::Value>,
}

/// Item of the /company-news array
#[derive(Debug, Deserialize)]
struct NewsItem {
    id: i64,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    datetime: i64,
    #[serde(default)]
    related: String,
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider.
///
/// Priority 2: quotes, fundamentals and news. Every call fails with
/// `MissingApiKey` when constructed without a key.
pub struct FinnhubProvider {
    client: Client,
    api_key: Option<String>,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider. Empty keys count as missing.
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

    fn api_key(&self) -> Result<&str, MarketDataError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| MarketDataError::MissingApiKey {
                provider: PROVIDER_NAME.to_string(),
            })
    }

    /// Make a GET request to the Finnhub API.
    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let api_key = self.api_key()?;
        let url = format!("{}{}", BASE_URL, endpoint);

        // Key goes in a header so it never shows up in logged URLs
        let request = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", api_key)
            .query(params);

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let response = request.send().await?;
        let status = response.status();

        // 403 is what the free tier answers once the quota is exhausted
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or(body);
            return Err(MarketDataError::Http {
                provider: PROVIDER_NAME.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}

/// Map a /quote body to a Quote.
///
/// Finnhub answers unknown symbols with an all-zero quote instead of an error.
fn parse_quote(symbol: &str, body: &str) -> Result<Quote, MarketDataError> {
    if let Ok(ErrorResponse { error: Some(message) }) = serde_json::from_str::<ErrorResponse>(body) {
        return Err(MarketDataError::ProviderError {
            provider: PROVIDER_NAME.to_string(),
            message,
        });
    }

    let response: QuoteResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
            provider: PROVIDER_NAME.to_string(),
            message: format!("Failed to parse quote response: {}", e),
        })?;

    let price = response.c.unwrap_or(0.0);
    let high = response.h.unwrap_or(0.0);
    let low = response.l.unwrap_or(0.0);
    if price == 0.0 && high == 0.0 && low == 0.0 {
        return Err(MarketDataError::SymbolNotFound(format!(
            "Symbol {} not found on Finnhub",
            symbol
        )));
    }

    let mut quote = Quote::new(symbol, price, response.pc.unwrap_or(0.0), PROVIDER_NAME);
    quote.open = response.o.unwrap_or(price);
    quote.day_high = high;
    quote.day_low = low;
    if let Some(ts) = response.t.and_then(|t| chrono::DateTime::from_timestamp(t, 0)) {
        quote.timestamp = ts;
    }
    Ok(quote)
}

/// Map a /stock/metric body to a FundamentalSnapshot.
///
/// Market cap and average volume are reported in millions.
fn parse_metrics(symbol: &str, body: &str) -> Result<FundamentalSnapshot, MarketDataError> {
    let response: MetricResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
            provider: PROVIDER_NAME.to_string(),
            message: format!("Failed to parse metric response: {}", e),
        })?;

    if response.metric.is_empty() {
        return Err(MarketDataError::SymbolNotFound(format!(
            "No fundamentals for {} on Finnhub",
            symbol
        )));
    }

    let metric = |key: &str| response.metric.get(key).and_then(|v| v.as_f64());

    Ok(FundamentalSnapshot {
        symbol: symbol.to_string(),
        market_cap: metric("marketCapitalization").map(|v| v * 1_000_000.0),
        pe_ratio: metric("peBasicExclExtraTTM"),
        forward_pe: None,
        dividend_yield: metric("dividendYieldIndicatedAnnual"),
        fifty_two_week_high: metric("52WeekHigh").unwrap_or(0.0),
        fifty_two_week_low: metric("52WeekLow").unwrap_or(0.0),
        average_volume: metric("10DayAverageTradingVolume").map(|v| v * 1_000_000.0),
        beta: metric("beta"),
        eps: metric("epsBasicExclExtraItemsTTM"),
        provider: PROVIDER_NAME.to_string(),
    })
}

/// Map a /company-news body to at most [`MAX_NEWS_ITEMS`] articles.
fn parse_news(body: &str) -> Result<Vec<NewsArticle>, MarketDataError> {
    let items: Vec<NewsItem> =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
            provider: PROVIDER_NAME.to_string(),
            message: format!("Failed to parse news response: {}", e),
        })?;

    Ok(items
        .into_iter()
        .take(MAX_NEWS_ITEMS)
        .map(|item| NewsArticle {
            id: item.id.to_string(),
            headline: item.headline,
            summary: item.summary,
            source: item.source,
            url: item.url,
            image: item.image.filter(|i| !i.is_empty()),
            datetime: item.datetime,
            related: item.related,
        })
        .collect())
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn priority(&self) -> u8 {
        2
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            quote: true,
            fundamentals: true,
            historical: false,
            news: true,
        }
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let body = self.fetch("/quote", &[("symbol", symbol)]).await?;
        parse_quote(symbol, &body)
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, MarketDataError> {
        let body = self
            .fetch("/stock/metric", &[("symbol", symbol), ("metric", "all")])
            .await?;
        parse_metrics(symbol, &body)
    }

    async fn get_news(&self, symbol: &str) -> Result<Vec<NewsArticle>, MarketDataError> {
        let today = Utc::now().date_naive();
        let from = today
            .checked_sub_days(Days::new(NEWS_LOOKBACK_DAYS))
            .unwrap_or(today)
            .format("%Y-%m-%d")
            .to_string();
        let to = today.format("%Y-%m-%d").to_string();

        let body = self
            .fetch(
                "/company-news",
                &[("symbol", symbol), ("from", from.as_str()), ("to", to.as_str())],
            )
            .await?;
        parse_news(&body)
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_none() {
            return false;
        }
        match self.fetch("/quote", &[("symbol", "AAPL")]).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Finnhub health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name_and_priority() {
        let provider = FinnhubProvider::new(Some("test_key".to_string()));
        assert_eq!(provider.name(), "Finnhub");
        assert_eq!(provider.priority(), 2);
        assert!(!provider.capabilities().historical);
        assert!(provider.capabilities().news);
    }

    #[test]
    fn test_quote_response_parsing() {
        let json = r#"{"c":189.5,"d":1.2,"dp":0.7,"h":190.1,"l":187.9,"o":188.0,"pc":187.25,"t":1704214800}"#;
        let quote = parse_quote("AAPL", json).unwrap();
        assert_eq!(quote.price, 189.5);
        assert_eq!(quote.previous_close, 187.25);
        assert!((quote.change - 2.25).abs() < 1e-9);
        let expected = (189.5 - 187.25) / 187.25 * 100.0;
        assert!((quote.change_percent - expected).abs() < 1e-9);
        assert_eq!(quote.day_high, 190.1);
        assert_eq!(quote.provider, "Finnhub");
        assert_eq!(quote.timestamp.timestamp(), 1704214800);
    }

    #[test]
    fn test_all_zero_quote_is_not_found() {
        let json = r#"{"c":0,"d":null,"dp":null,"h":0,"l":0,"o":0,"pc":0,"t":0}"#;
        let err = parse_quote("NOPE", json).unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_error_body_is_provider_error() {
        let json = r#"{"error":"You don't have access to this resource."}"#;
        let err = parse_quote("AAPL", json).unwrap_err();
        assert!(matches!(err, MarketDataError::ProviderError { .. }));
    }

    #[test]
    fn test_metric_response_scales_millions() {
        let json = r#"{
            "metric": {
                "marketCapitalization": 2900000.5,
                "peBasicExclExtraTTM": 29.4,
                "dividendYieldIndicatedAnnual": 0.52,
                "52WeekHigh": 199.62,
                "52WeekLow": 164.08,
                "10DayAverageTradingVolume": 55.3,
                "beta": 1.29,
                "epsBasicExclExtraItemsTTM": 6.13
            },
            "metricType": "all",
            "symbol": "AAPL"
        }"#;
        let snapshot = parse_metrics("AAPL", json).unwrap();
        assert_eq!(snapshot.market_cap, Some(2_900_000.5 * 1_000_000.0));
        assert_eq!(snapshot.average_volume, Some(55.3 * 1_000_000.0));
        assert_eq!(snapshot.fifty_two_week_high, 199.62);
        assert_eq!(snapshot.eps, Some(6.13));
        assert_eq!(snapshot.forward_pe, None);
    }

    #[test]
    fn test_empty_metrics_is_not_found() {
        let err = parse_metrics("NOPE", r#"{"metric":{}}"#).unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_missing_52_week_defaults_to_zero() {
        let snapshot = parse_metrics("X", r#"{"metric":{"beta":1.0}}"#).unwrap();
        assert_eq!(snapshot.fifty_two_week_high, 0.0);
        assert_eq!(snapshot.fifty_two_week_low, 0.0);
    }

    #[test]
    fn test_news_parsing_caps_items() {
        let items: Vec<String> = (0..25)
            .map(|i| {
                format!(
                    r#"{{"id":{},"headline":"h{}","summary":"s","source":"Reuters","url":"https://x/{}","image":"","datetime":1704214800,"related":"AAPL"}}"#,
                    i, i, i
                )
            })
            .collect();
        let json = format!("[{}]", items.join(","));
        let news = parse_news(&json).unwrap();
        assert_eq!(news.len(), 20);
        assert_eq!(news[0].id, "0");
        assert_eq!(news[0].image, None);
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let provider = FinnhubProvider::new(Some("  ".to_string()));
        let err = provider.get_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, MarketDataError::MissingApiKey { .. }));
        assert!(!provider.is_available().await);
    }
}
