//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! market data adapters implement.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{FundamentalSnapshot, HistoricalPoint, HistoricalRange, NewsArticle, Quote};

use super::capabilities::ProviderCapabilities;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source. The
/// registry uses the provider's capabilities and priority to decide when to
/// call it. Only the operations advertised in [`capabilities`](Self::capabilities)
/// need real implementations; the rest default to `NotSupported`.
///
/// Symbols arrive already upper-cased. Adapters URL-encode them before
/// building outbound requests and translate every upstream shape into the
/// canonical models. Any failure, including "not found" sentinels and rate
/// limits hidden inside a 200 body, must come back as an `Err`.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use stockwatch_market_data::provider::{MarketDataProvider, ProviderCapabilities};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn name(&self) -> &'static str {
///         "My Provider"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities { quote: true, ..Default::default() }
///     }
///
///     // ... implement get_quote and is_available
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable provider name, e.g. "Yahoo Finance".
    ///
    /// Used in results, diagnostics and logs.
    fn name(&self) -> &'static str;

    /// Provider priority for ordering.
    ///
    /// Lower values are tried first. Default is 10.
    fn priority(&self) -> u8 {
        10
    }

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Fetch the latest quote for a symbol.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Upper-cased ticker
    ///
    /// # Returns
    ///
    /// The quote on success, or a `MarketDataError` on failure.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch fundamental metrics for a symbol.
    ///
    /// Default implementation returns `NotSupported`.
    async fn get_fundamentals(&self, symbol: &str) -> Result<FundamentalSnapshot, MarketDataError> {
        let _ = symbol;
        Err(MarketDataError::NotSupported {
            operation: "fundamentals".to_string(),
            provider: self.name().to_string(),
        })
    }

    /// Fetch a historical series for a symbol.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Upper-cased ticker
    /// * `range` - Window to cover; the adapter maps it to its own interval
    ///
    /// # Returns
    ///
    /// Points sorted ascending by date. When the upstream source caps the
    /// output size, the most recent points are kept.
    /// Default implementation returns `NotSupported`.
    async fn get_historical(
        &self,
        symbol: &str,
        range: HistoricalRange,
    ) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        let _ = (symbol, range);
        Err(MarketDataError::NotSupported {
            operation: "historical".to_string(),
            provider: self.name().to_string(),
        })
    }

    /// Fetch recent company news for a symbol.
    ///
    /// Default implementation returns `NotSupported`.
    async fn get_news(&self, symbol: &str) -> Result<Vec<NewsArticle>, MarketDataError> {
        let _ = symbol;
        Err(MarketDataError::NotSupported {
            operation: "news".to_string(),
            provider: self.name().to_string(),
        })
    }

    /// Cheap representative call used by health checks.
    ///
    /// Must never panic or return an error; any failure means `false`.
    async fn is_available(&self) -> bool;
}
