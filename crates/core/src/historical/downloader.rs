//! CSV download endpoints for bulk historical imports.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;

use crate::errors::{Error, Result};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Symbols traded in the US that Stooq only knows with a `.us` suffix.
const STOOQ_US_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "GOOG", "AMZN", "META", "TSLA", "NVDA", "AMD", "INTC", "NFLX", "DIS",
    "V", "MA", "JPM", "BAC", "WMT", "PG", "JNJ", "UNH",
];

/// XETRA symbols that Stooq lists with a `.de` suffix.
const STOOQ_DE_SYMBOLS: &[&str] = &[
    "SAP", "BMW", "SIE", "ALV", "BAS", "DTE", "VOW3", "MRK", "ADS", "DBK", "DPW", "RWE", "EON",
    "HEN3", "FRE", "IFX", "MUV2", "CON",
];

/// Fetches CSV text over HTTP.
#[async_trait]
pub trait HistoricalDownloaderTrait: Send + Sync {
    /// Body of a successful response. Non-success status codes are errors.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HistoricalDownloaderTrait for HttpDownloader {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("Downloading {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Import(format!("returned HTTP {}", status.as_u16())));
        }
        Ok(response.text().await?)
    }
}

/// Yahoo daily history download between `start` (epoch when absent) and `end`.
pub fn yahoo_download_url(
    base: &str,
    symbol: &str,
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
) -> String {
    let period1 = start.map(|s| s.timestamp()).unwrap_or(0);
    format!(
        "{}/{}?period1={}&period2={}&interval=1d&events=history",
        base.trim_end_matches('/'),
        urlencoding::encode(symbol),
        period1,
        end.timestamp()
    )
}

/// Stooq daily history download for an already formatted Stooq symbol.
pub fn stooq_download_url(base: &str, stooq_symbol: &str) -> String {
    format!(
        "{}?s={}&i=d",
        base,
        urlencoding::encode(&stooq_symbol.to_lowercase())
    )
}

/// Maps a ticker to Stooq's lower-case, country-suffixed form.
///
/// Symbols that already carry a suffix are only lower-cased. Otherwise the
/// suffix comes from `market` or from the built-in lists of well-known US
/// and German tickers.
pub fn format_symbol_for_stooq(symbol: &str, market: Option<&str>) -> String {
    let lower = symbol.trim().to_lowercase();
    if lower.contains('.') {
        return lower;
    }

    let upper = lower.to_uppercase();
    let market = market.map(|m| m.to_uppercase());
    if STOOQ_US_SYMBOLS.contains(&upper.as_str()) || market.as_deref() == Some("US") {
        return format!("{}.us", lower);
    }
    if STOOQ_DE_SYMBOLS.contains(&upper.as_str()) || market.as_deref() == Some("DE") {
        return format!("{}.de", lower);
    }
    lower
}
