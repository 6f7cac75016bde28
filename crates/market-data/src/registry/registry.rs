//! Provider registry for orchestrating market data providers.
//!
//! The registry holds the adapters in priority order and handles:
//! - Provider selection by capability
//! - Fallback to the next provider on failure
//! - Per-request error collection plus a process-wide rolling error log
//! - Concurrent health checks

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use log::{debug, info, warn};
use serde::Serialize;

use super::diagnostics::{ProviderError, ProviderErrorLog, ServiceResponse};
use crate::clock::{Clock, SystemClock};
use crate::errors::MarketDataError;
use crate::models::{
    normalize_series, FundamentalSnapshot, HistoricalPoint, HistoricalRange, NewsArticle, Quote,
};
use crate::provider::{Capability, MarketDataProvider, ProviderCapabilities};

/// Number of entries returned by [`ProviderRegistry::recent_errors`].
pub const RECENT_ERRORS: usize = 20;

/// Upper bound for a single `is_available` probe.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(15);

/// Static description of a registered adapter.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    pub priority: u8,
    pub capabilities: ProviderCapabilities,
}

/// Provider registry for orchestrating market data fetching.
pub struct ProviderRegistry {
    /// Sorted ascending by priority, fixed after construction
    providers: Vec<Arc<dyn MarketDataProvider>>,
    error_log: ProviderErrorLog,
    clock: Arc<dyn Clock>,
}

impl ProviderRegistry {
    /// Create a new provider registry.
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        Self::with_clock(providers, Arc::new(SystemClock))
    }

    /// Create a registry stamping errors with the given clock.
    pub fn with_clock(
        mut providers: Vec<Arc<dyn MarketDataProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // stable: equal priorities keep registration order
        providers.sort_by_key(|p| p.priority());
        Self {
            providers,
            error_log: ProviderErrorLog::default(),
            clock,
        }
    }

    /// Providers advertising `capability`, in the order they are tried.
    pub fn providers_for(&self, capability: Capability) -> Vec<&Arc<dyn MarketDataProvider>> {
        self.providers
            .iter()
            .filter(|p| p.capabilities().supports(capability))
            .collect()
    }

    /// Fetch the latest quote.
    ///
    /// `change` and `change_percent` are re-derived from the price pair,
    /// whatever the adapter reported.
    pub async fn get_quote(&self, symbol: &str) -> ServiceResponse<Quote> {
        let symbol = normalize_symbol(symbol);
        let sym = symbol.as_str();
        self.try_providers(Capability::Quote, sym, move |p| p.get_quote(sym))
            .await
            .map(|mut quote| {
                quote.recompute_change();
                quote
            })
    }

    /// Fetch fundamental metrics.
    pub async fn get_fundamentals(&self, symbol: &str) -> ServiceResponse<FundamentalSnapshot> {
        let symbol = normalize_symbol(symbol);
        let sym = symbol.as_str();
        self.try_providers(Capability::Fundamentals, sym, move |p| p.get_fundamentals(sym))
            .await
    }

    /// Fetch a historical series, sorted ascending by date.
    pub async fn get_historical(
        &self,
        symbol: &str,
        range: HistoricalRange,
    ) -> ServiceResponse<Vec<HistoricalPoint>> {
        let symbol = normalize_symbol(symbol);
        let sym = symbol.as_str();
        self.try_providers(Capability::Historical, sym, move |p| p.get_historical(sym, range))
            .await
            .map(|points| normalize_series(points, None))
    }

    /// Fetch recent company news.
    pub async fn get_news(&self, symbol: &str) -> ServiceResponse<Vec<NewsArticle>> {
        let symbol = normalize_symbol(symbol);
        let sym = symbol.as_str();
        self.try_providers(Capability::News, sym, move |p| p.get_news(sym))
            .await
    }

    /// Try every capable provider in priority order.
    ///
    /// Returns on the first success, carrying the errors of the providers
    /// tried before it. Each failure is also appended to the rolling log.
    async fn try_providers<'a, T, F>(
        &'a self,
        capability: Capability,
        symbol: &'a str,
        call: F,
    ) -> ServiceResponse<T>
    where
        F: Fn(&'a dyn MarketDataProvider) -> BoxFuture<'a, Result<T, MarketDataError>>,
    {
        let providers = self.providers_for(capability);

        if providers.is_empty() {
            warn!("No providers available for {}", capability.as_str());
            return ServiceResponse::failed(Vec::new());
        }

        let mut errors = Vec::new();

        for provider in providers {
            let name = provider.name();
            debug!(
                "Fetching {} for {} from provider '{}'",
                capability.as_str(),
                symbol,
                name
            );

            match call(provider.as_ref()).await {
                Ok(data) => {
                    info!(
                        "Resolved {} for {} via '{}' after {} failure(s)",
                        capability.as_str(),
                        symbol,
                        name,
                        errors.len()
                    );
                    return ServiceResponse::ok(data, name, errors);
                }
                Err(e) => {
                    warn!(
                        "Provider '{}' failed {} for {}: {}",
                        name,
                        capability.as_str(),
                        symbol,
                        e
                    );
                    let recorded = ProviderError::from_error(name, &e, self.clock.now());
                    self.error_log.push(recorded.clone());
                    errors.push(recorded);
                }
            }
        }

        warn!(
            "All {} provider(s) failed {} for {}",
            errors.len(),
            capability.as_str(),
            symbol
        );
        ServiceResponse::failed(errors)
    }

    /// Probe every provider concurrently.
    ///
    /// Each probe runs in its own task with a timeout, so a hung or
    /// panicking adapter only reports itself as unavailable.
    pub async fn check_provider_health(&self) -> HashMap<String, bool> {
        let probes = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let name = provider.name().to_string();
            let handle = tokio::spawn(async move {
                tokio::time::timeout(HEALTH_CHECK_TIMEOUT, provider.is_available())
                    .await
                    .unwrap_or(false)
            });
            async move {
                let up = match handle.await {
                    Ok(up) => up,
                    Err(e) => {
                        warn!("Health check task for '{}' failed: {}", name, e);
                        false
                    }
                };
                (name, up)
            }
        });

        join_all(probes).await.into_iter().collect()
    }

    /// Last entries of the rolling error log, oldest first.
    pub fn recent_errors(&self) -> Vec<ProviderError> {
        self.error_log.recent(RECENT_ERRORS)
    }

    /// Last `n` entries of the rolling error log, oldest first.
    pub fn recent_errors_n(&self, n: usize) -> Vec<ProviderError> {
        self.error_log.recent(n)
    }

    /// Name, priority and capabilities of each provider, in priority order.
    pub fn provider_info(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|p| ProviderInfo {
                name: p.name().to_string(),
                priority: p.priority(),
                capabilities: p.capabilities(),
            })
            .collect()
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        name: &'static str,
        priority: u8,
        call_count: AtomicUsize,
        should_fail: bool,
        capabilities: ProviderCapabilities,
    }

    impl MockProvider {
        fn new(name: &'static str, priority: u8, should_fail: bool) -> Self {
            Self {
                name,
                priority,
                call_count: AtomicUsize::new(0),
                should_fail,
                capabilities: ProviderCapabilities {
                    quote: true,
                    fundamentals: false,
                    historical: true,
                    news: false,
                },
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn fail(&self) -> MarketDataError {
            MarketDataError::ProviderError {
                provider: self.name.to_string(),
                message: "Mock failure".to_string(),
            }
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn capabilities(&self) -> ProviderCapabilities {
            self.capabilities
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                return Err(self.fail());
            }
            let mut quote = Quote::new(symbol, 102.0, 100.0, self.name);
            // upstream-reported change that disagrees with the prices
            quote.change_percent = 99.0;
            Ok(quote)
        }

        async fn get_historical(
            &self,
            _symbol: &str,
            _range: HistoricalRange,
        ) -> Result<Vec<HistoricalPoint>, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                return Err(self.fail());
            }
            let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
            Ok(vec![
                HistoricalPoint::close_only(day(3), 3.0),
                HistoricalPoint::close_only(day(1), 1.0),
            ])
        }

        async fn is_available(&self) -> bool {
            !self.should_fail
        }
    }

    fn registry(providers: Vec<Arc<MockProvider>>) -> ProviderRegistry {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn MarketDataProvider>)
            .collect();
        ProviderRegistry::new(providers)
    }

    #[test]
    fn test_provider_ordering_by_priority() {
        let registry = registry(vec![
            Arc::new(MockProvider::new("LOW_PRIORITY", 20, false)),
            Arc::new(MockProvider::new("HIGH_PRIORITY", 5, false)),
            Arc::new(MockProvider::new("MED_PRIORITY", 10, false)),
        ]);

        let ordered = registry.providers_for(Capability::Quote);
        assert_eq!(ordered[0].name(), "HIGH_PRIORITY");
        assert_eq!(ordered[1].name(), "MED_PRIORITY");
        assert_eq!(ordered[2].name(), "LOW_PRIORITY");
    }

    #[test]
    fn test_filter_by_capability() {
        let registry = registry(vec![Arc::new(MockProvider::new("A", 1, false))]);
        assert_eq!(registry.providers_for(Capability::Quote).len(), 1);
        assert!(registry.providers_for(Capability::Fundamentals).is_empty());
    }

    #[tokio::test]
    async fn test_fallback_keeps_prior_errors() {
        let a = Arc::new(MockProvider::new("A", 1, true));
        let b = Arc::new(MockProvider::new("B", 2, false));
        let c = Arc::new(MockProvider::new("C", 3, false));
        let registry = registry(vec![a.clone(), b.clone(), c.clone()]);

        let response = registry.get_quote("aapl").await;

        assert!(response.success);
        assert_eq!(response.provider.as_deref(), Some("B"));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].provider, "A");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 0, "no calls after the first success");
        assert_eq!(response.data.unwrap().symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_exhaustion_reports_every_provider() {
        let registry = registry(vec![
            Arc::new(MockProvider::new("A", 1, true)),
            Arc::new(MockProvider::new("B", 2, true)),
        ]);

        let response = registry.get_quote("MSFT").await;

        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 2);
        assert_eq!(registry.recent_errors().len(), 2);
    }

    #[tokio::test]
    async fn test_quote_change_percent_is_rederived() {
        let registry = registry(vec![Arc::new(MockProvider::new("A", 1, false))]);
        let quote = registry.get_quote("AAPL").await.data.unwrap();
        assert!((quote.change_percent - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_historical_is_sorted() {
        let registry = registry(vec![Arc::new(MockProvider::new("A", 1, false))]);
        let points = registry
            .get_historical("AAPL", HistoricalRange::OneMonth)
            .await
            .data
            .unwrap();
        assert!(points[0].date < points[1].date);
    }

    #[tokio::test]
    async fn test_unsupported_capability_fails_without_calls() {
        let a = Arc::new(MockProvider::new("A", 1, false));
        let registry = registry(vec![a.clone()]);

        let response = registry.get_news("AAPL").await;

        assert!(!response.success);
        assert!(response.errors.is_empty());
        assert_eq!(a.calls(), 0);
    }

    #[tokio::test]
    async fn test_errors_use_registry_clock() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(at));
        let registry = ProviderRegistry::with_clock(
            vec![Arc::new(MockProvider::new("A", 1, true)) as Arc<dyn MarketDataProvider>],
            clock,
        );

        let response = registry.get_quote("AAPL").await;
        assert_eq!(response.errors[0].timestamp, at);
    }

    #[tokio::test]
    async fn test_health_check_isolates_failures() {
        let registry = registry(vec![
            Arc::new(MockProvider::new("UP", 1, false)),
            Arc::new(MockProvider::new("DOWN", 2, true)),
        ]);

        let health = registry.check_provider_health().await;
        assert_eq!(health.len(), 2);
        assert_eq!(health.get("UP"), Some(&true));
        assert_eq!(health.get("DOWN"), Some(&false));
    }

    #[test]
    fn test_provider_info_in_priority_order() {
        let registry = registry(vec![
            Arc::new(MockProvider::new("B", 2, false)),
            Arc::new(MockProvider::new("A", 1, false)),
        ]);
        let info = registry.provider_info();
        assert_eq!(info[0].name, "A");
        assert_eq!(info[1].priority, 2);
        assert!(info[0].capabilities.quote);
    }
}
