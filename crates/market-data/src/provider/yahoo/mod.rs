//! Yahoo Finance market data provider.
//!
//! This provider talks to two unofficial Yahoo Finance endpoints:
//! - v8 chart for latest quotes and historical series
//! - v10 quoteSummary for fundamentals (needs a cookie/crumb pair)
//!
//! No API key is required. Priority 1, so it is tried first.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{header, Client, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use urlencoding::encode;

use crate::errors::MarketDataError;
use crate::models::{
    collapse_intraday, normalize_series, FundamentalSnapshot, HistoricalPoint, HistoricalRange,
    Quote,
};
use crate::provider::{MarketDataProvider, ProviderCapabilities, USER_AGENT};

use models::{
    RawValue, YahooChartResponse, YahooChartResult, YahooQuoteSummaryResponse,
    YahooQuoteSummaryResult,
};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const PROVIDER_NAME: &str = "Yahoo Finance";

// ============================================================================
// Crumb/Cookie Authentication
// ============================================================================

/// Cached Yahoo authentication data
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    client: Client,
    crumb: RwLock<Option<CrumbData>>,
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            crumb: RwLock::new(None),
        }
    }

    fn provider_error(message: impl Into<String>) -> MarketDataError {
        MarketDataError::ProviderError {
            provider: PROVIDER_NAME.to_string(),
            message: message.into(),
        }
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    /// Ensure we have a valid Yahoo authentication crumb.
    async fn ensure_crumb(&self) -> Result<CrumbData, MarketDataError> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }
        self.fetch_crumb().await
    }

    /// Fetch a new Yahoo authentication crumb.
    async fn fetch_crumb(&self) -> Result<CrumbData, MarketDataError> {
        // Step 1: Get cookie from fc.yahoo.com
        let response = self
            .client
            .get("https://fc.yahoo.com")
            .send()
            .await
            .map_err(|e| Self::provider_error(format!("Failed to get cookie: {}", e)))?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| Self::provider_error("Failed to parse Yahoo cookie"))?;

        // Step 2: Get crumb using cookie
        let crumb = self
            .client
            .get("https://query1.finance.yahoo.com/v1/test/getcrumb")
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .map_err(|e| Self::provider_error(format!("Failed to get crumb: {}", e)))?
            .text()
            .await
            .map_err(|e| Self::provider_error(format!("Failed to read crumb: {}", e)))?;

        let crumb_data = CrumbData { cookie, crumb };
        *self.crumb.write().await = Some(crumb_data.clone());
        Ok(crumb_data)
    }

    /// Clear the cached crumb (used when authentication fails)
    async fn clear_crumb(&self) {
        *self.crumb.write().await = None;
    }

    // ========================================================================
    // Chart API
    // ========================================================================

    async fn fetch_chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<YahooChartResult, MarketDataError> {
        let url = format!(
            "{}/{}?interval={}&range={}",
            CHART_URL,
            encode(symbol),
            interval,
            range
        );
        debug!("Yahoo chart request: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        let body = response.text().await?;
        parse_chart(symbol, status, &body)
    }

    // ========================================================================
    // quoteSummary API
    // ========================================================================

    async fn fetch_quote_summary(
        &self,
        symbol: &str,
    ) -> Result<YahooQuoteSummaryResult, MarketDataError> {
        let crumb = self.ensure_crumb().await?;

        let url = format!(
            "{}/{}?modules=summaryDetail,defaultKeyStatistics,financialData&crumb={}",
            SUMMARY_URL,
            encode(symbol),
            encode(&crumb.crumb)
        );

        let response = self
            .client
            .get(&url)
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.clear_crumb().await;
                return Err(Self::provider_error("Yahoo authentication expired"));
            }
            StatusCode::NOT_FOUND => {
                return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                });
            }
            status if !status.is_success() => {
                return Err(MarketDataError::Http {
                    provider: PROVIDER_NAME.to_string(),
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or_default().to_string(),
                });
            }
            _ => {}
        }

        let data: YahooQuoteSummaryResponse =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::InvalidResponse {
                    provider: PROVIDER_NAME.to_string(),
                    message: format!("Failed to parse quoteSummary response: {}", e),
                })?;

        data.quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))
    }
}

// ============================================================================
// Response mapping
// ============================================================================

fn parse_chart(
    symbol: &str,
    status: StatusCode,
    body: &str,
) -> Result<YahooChartResult, MarketDataError> {
    let parsed: Result<YahooChartResponse, _> = serde_json::from_str(body);

    match parsed {
        Ok(response) => {
            if let Some(err) = response.chart.error {
                let code = err.code.unwrap_or_default();
                if code == "Not Found" || status == StatusCode::NOT_FOUND {
                    return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
                }
                return Err(YahooProvider::provider_error(format!(
                    "{}: {}",
                    code,
                    err.description.unwrap_or_default()
                )));
            }
            response
                .chart
                .result
                .and_then(|r| r.into_iter().next())
                .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))
        }
        Err(_) if !status.is_success() => Err(MarketDataError::Http {
            provider: PROVIDER_NAME.to_string(),
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        }),
        Err(e) => Err(MarketDataError::InvalidResponse {
            provider: PROVIDER_NAME.to_string(),
            message: format!("Failed to parse chart response: {}", e),
        }),
    }
}

fn chart_to_quote(symbol: &str, result: &YahooChartResult) -> Result<Quote, MarketDataError> {
    let meta = &result.meta;
    let price = meta
        .regular_market_price
        .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .unwrap_or(price);

    let reported = meta.symbol.clone().unwrap_or_else(|| symbol.to_string());
    let mut quote = Quote::new(reported, price, previous_close, PROVIDER_NAME);

    if let Some(name) = meta.short_name.clone().or_else(|| meta.long_name.clone()) {
        quote.name = name;
    }
    quote.open = result
        .indicators
        .as_ref()
        .and_then(|i| i.quote.first())
        .and_then(|q| q.open.first().copied().flatten())
        .unwrap_or(price);
    quote.day_high = meta.regular_market_day_high.unwrap_or(price);
    quote.day_low = meta.regular_market_day_low.unwrap_or(price);
    quote.volume = meta.regular_market_volume.unwrap_or(0);
    if let Some(currency) = meta.currency.clone() {
        quote.currency = currency;
    }
    Ok(quote)
}

/// Map a range to the bar interval requested from the chart endpoint.
fn chart_interval(range: HistoricalRange) -> &'static str {
    match range {
        HistoricalRange::OneDay => "5m",
        HistoricalRange::FiveDays => "15m",
        HistoricalRange::OneMonth | HistoricalRange::ThreeMonths | HistoricalRange::YearToDate => {
            "1d"
        }
        HistoricalRange::OneYear => "1wk",
        HistoricalRange::FiveYears | HistoricalRange::Max => "1mo",
    }
}

/// Convert chart columns into points. Bars with a null close are dropped.
fn chart_to_points(result: &YahooChartResult, range: HistoricalRange) -> Vec<HistoricalPoint> {
    let Some(indicators) = result.indicators.as_ref() else {
        return Vec::new();
    };
    let Some(columns) = indicators.quote.first() else {
        return Vec::new();
    };
    let adjclose = indicators.adjclose.first().map(|a| a.adjclose.as_slice());

    let at = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    let bars: Vec<HistoricalPoint> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = at(&columns.close, i)?;
            let date: NaiveDate = DateTime::<Utc>::from_timestamp(*ts, 0)?.date_naive();
            Some(HistoricalPoint {
                date,
                open: at(&columns.open, i),
                high: at(&columns.high, i),
                low: at(&columns.low, i),
                close,
                adjusted_close: adjclose.and_then(|a| at(a, i)),
                volume: columns.volume.get(i).copied().flatten(),
            })
        })
        .collect();

    let points = if range.is_intraday() {
        collapse_intraday(bars)
    } else {
        bars
    };
    normalize_series(points, None)
}

fn summary_to_snapshot(symbol: &str, result: &YahooQuoteSummaryResult) -> FundamentalSnapshot {
    let mut snapshot = FundamentalSnapshot {
        symbol: symbol.to_string(),
        provider: PROVIDER_NAME.to_string(),
        ..Default::default()
    };

    if let Some(detail) = result.summary_detail.as_ref() {
        snapshot.market_cap = detail.market_cap.raw();
        snapshot.pe_ratio = detail.trailing_pe.raw();
        snapshot.forward_pe = detail.forward_pe.raw();
        snapshot.dividend_yield = detail.dividend_yield.raw();
        snapshot.fifty_two_week_high = detail.fifty_two_week_high.raw().unwrap_or(0.0);
        snapshot.fifty_two_week_low = detail.fifty_two_week_low.raw().unwrap_or(0.0);
        snapshot.average_volume = detail.average_volume.raw();
    }
    if let Some(stats) = result.default_key_statistics.as_ref() {
        snapshot.beta = stats.beta.raw();
        snapshot.eps = stats.trailing_eps.raw();
    }
    snapshot
}

// ============================================================================
// MarketDataProvider Implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn priority(&self) -> u8 {
        1
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
        let result = self.fetch_chart(symbol, "1d", "1d").await?;
        chart_to_quote(symbol, &result)
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, MarketDataError> {
        let result = self.fetch_quote_summary(symbol).await?;
        Ok(summary_to_snapshot(symbol, &result))
    }

    async fn get_historical(
        &self,
        symbol: &str,
        range: HistoricalRange,
    ) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        let result = self
            .fetch_chart(symbol, chart_interval(range), range.as_str())
            .await?;
        let points = chart_to_points(&result, range);
        if points.is_empty() {
            warn!("Yahoo returned no usable bars for {} ({})", symbol, range);
            return Err(MarketDataError::NoDataForRange);
        }
        debug!("Yahoo: fetched {} points for {}", points.len(), symbol);
        Ok(points)
    }

    async fn is_available(&self) -> bool {
        self.fetch_chart("AAPL", "1d", "1d").await.is_ok()
    }
}
