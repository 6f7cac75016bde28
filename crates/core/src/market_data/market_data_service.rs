use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stockwatch_market_data::{
    Clock, FundamentalSnapshot, HistoricalPoint, HistoricalRange, NewsArticle, ProviderRegistry,
    Quote, ServiceResponse,
};

use super::market_data_constants::*;
use super::market_data_model::{HealthReport, HealthStatus, ImportRequest, ProviderHealth};
use super::market_data_traits::MarketDataServiceTrait;
use crate::cache::{CacheKind, StockCache};
use crate::errors::{Result, ValidationError};
use crate::historical::{BulkUpdateSummary, HistoricalServiceTrait, ImportResult, ImportSource};
use crate::metadata::{MetadataServiceTrait, MetadataUpdate};
use crate::performance::{calculate_performance, PerformanceData};

/// Cache, local store and provider registry behind one interface.
pub struct MarketDataService {
    registry: Arc<ProviderRegistry>,
    cache: Arc<StockCache>,
    historical: Arc<dyn HistoricalServiceTrait>,
    metadata: Arc<dyn MetadataServiceTrait>,
    clock: Arc<dyn Clock>,
}

impl MarketDataService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: Arc<StockCache>,
        historical: Arc<dyn HistoricalServiceTrait>,
        metadata: Arc<dyn MetadataServiceTrait>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            cache,
            historical,
            metadata,
            clock,
        }
    }

    /// Serves from cache, otherwise runs `fetch` and caches a success.
    async fn cached_or_fetch<T, F, Fut>(
        &self,
        kind: CacheKind,
        symbol: &str,
        qualifier: Option<&str>,
        fetch: F,
    ) -> ServiceResponse<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ServiceResponse<T>> + Send,
    {
        if let Some(hit) = self.cache.get::<T>(kind, symbol, qualifier) {
            return ServiceResponse::cached(hit.data, hit.provider);
        }

        let response = fetch().await;
        if let (true, Some(data)) = (response.success, response.data.as_ref()) {
            if let Err(e) = self
                .cache
                .set(kind, symbol, data, response.provider.as_deref(), qualifier)
                .await
            {
                warn!("Could not cache {} for {}: {}", kind, symbol, e);
            }
        }
        response
    }

    /// Stored rows for the range, importing first when the store is thin.
    async fn stored_series(&self, symbol: &str, range: HistoricalRange) -> Vec<HistoricalPoint> {
        let stored = self.historical.get_stored_range(symbol, range);
        let thin = stored.is_empty() || (stored.len() < MIN_STORED_POINTS && !range.is_intraday());
        if !thin {
            return stored;
        }

        debug!(
            "Only {} stored points for {} ({}), importing",
            stored.len(),
            symbol,
            range
        );
        let import = self.historical.smart_import(symbol).await;
        if import.has_records() {
            self.historical.get_stored_range(symbol, range)
        } else {
            stored
        }
    }
}

fn validate_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ValidationError::MissingField("symbol".to_string()).into());
    }
    Ok(symbol)
}

#[async_trait]
impl MarketDataServiceTrait for MarketDataService {
    async fn resolve_quote(&self, symbol: &str) -> Result<ServiceResponse<Quote>> {
        let symbol = validate_symbol(symbol)?;
        let response = self
            .cached_or_fetch(CacheKind::Quote, &symbol, None, || {
                self.registry.get_quote(&symbol)
            })
            .await;
        Ok(response)
    }

    async fn resolve_fundamentals(
        &self,
        symbol: &str,
    ) -> Result<ServiceResponse<FundamentalSnapshot>> {
        let symbol = validate_symbol(symbol)?;
        let response = self
            .cached_or_fetch(CacheKind::Fundamentals, &symbol, None, || {
                self.registry.get_fundamentals(&symbol)
            })
            .await;
        Ok(response)
    }

    async fn resolve_historical(
        &self,
        symbol: &str,
        range: HistoricalRange,
    ) -> Result<ServiceResponse<Vec<HistoricalPoint>>> {
        let symbol = validate_symbol(symbol)?;
        let sym = symbol.as_str();

        if let Some(hit) = self
            .cache
            .get::<Vec<HistoricalPoint>>(CacheKind::Historical, sym, Some(range.as_str()))
        {
            return Ok(ServiceResponse::cached(hit.data, hit.provider));
        }

        let stored = self.stored_series(sym, range).await;
        let response = if stored.is_empty() {
            debug!("No stored series for {}, asking providers", sym);
            self.registry.get_historical(sym, range).await
        } else {
            ServiceResponse::ok(stored, DATA_SOURCE_DATABASE, Vec::new())
        };

        if let Some(points) = response.data.as_ref().filter(|p| !p.is_empty()) {
            if let Err(e) = self
                .cache
                .set(
                    CacheKind::Historical,
                    sym,
                    points,
                    response.provider.as_deref(),
                    Some(range.as_str()),
                )
                .await
            {
                warn!("Could not cache history for {}: {}", sym, e);
            }
        }
        Ok(response)
    }

    async fn resolve_performance(&self, symbol: &str) -> Result<ServiceResponse<PerformanceData>> {
        let history = self
            .resolve_historical(symbol, HistoricalRange::OneYear)
            .await?;
        let now = self.clock.now();

        let performance = history
            .data
            .as_deref()
            .and_then(|points| calculate_performance(symbol, points, now));

        Ok(match performance {
            Some(data) => ServiceResponse {
                success: true,
                data: Some(data),
                provider: history.provider,
                from_cache: history.from_cache,
                errors: history.errors,
            },
            None => ServiceResponse::failed(history.errors),
        })
    }

    async fn resolve_news(&self, symbol: &str) -> Result<ServiceResponse<Vec<NewsArticle>>> {
        let symbol = validate_symbol(symbol)?;
        let response = self
            .cached_or_fetch(CacheKind::News, &symbol, None, || async {
                let response = self.registry.get_news(&symbol).await;
                let empty = response.data.as_ref().map_or(true, |d| d.is_empty());
                match symbol.split_once('.') {
                    Some((base, _)) if response.success && empty && !base.is_empty() => {
                        debug!("No news for {}, retrying as {}", symbol, base);
                        let retry = self.registry.get_news(base).await;
                        if retry.success {
                            retry
                        } else {
                            response
                        }
                    }
                    _ => response,
                }
            })
            .await;
        Ok(response)
    }

    async fn import_historical(&self, request: ImportRequest) -> Result<ImportResult> {
        let symbol = validate_symbol(&request.symbol)?;

        let partial = MetadataUpdate {
            name: request.name.clone(),
            ..Default::default()
        };
        if let Err(e) = self.metadata.ensure_metadata_exists(&symbol, partial).await {
            warn!("Could not register metadata for {}: {}", symbol, e);
        }

        let result = match request.csv_content.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(content) => {
                let source = request.source.unwrap_or(ImportSource::Manual);
                self.historical.import_from_csv(&symbol, content, source).await
            }
            None => self.historical.smart_import(&symbol).await,
        };

        if result.has_records() {
            self.cache
                .invalidate(&symbol, Some(CacheKind::Historical))
                .await?;
        }
        Ok(result)
    }

    async fn run_scheduled_historical_update(&self) -> Result<BulkUpdateSummary> {
        let summary = self.historical.run_scheduled_update().await?;
        for result in summary.results.iter().filter(|r| r.has_records()) {
            self.cache
                .invalidate(&result.symbol, Some(CacheKind::Historical))
                .await?;
        }
        Ok(summary)
    }

    async fn cleanup_cache(&self) -> Result<usize> {
        self.cache.cleanup().await
    }

    async fn invalidate_cache(&self, symbol: &str, kind: Option<CacheKind>) -> Result<()> {
        let symbol = validate_symbol(symbol)?;
        self.cache.invalidate(&symbol, kind).await
    }

    async fn health(&self) -> HealthReport {
        let availability = self.registry.check_provider_health().await;
        let providers: Vec<ProviderHealth> = self
            .registry
            .provider_info()
            .into_iter()
            .map(|info| ProviderHealth {
                available: availability.get(&info.name).copied().unwrap_or(false),
                name: info.name,
                priority: info.priority,
                capabilities: info.capabilities,
            })
            .collect();

        let flags: Vec<bool> = providers.iter().map(|p| p.available).collect();
        let status = HealthStatus::from_availability(&flags);
        info!("Provider health: {:?}", status);

        HealthReport {
            status,
            providers,
            recent_errors: self.registry.recent_errors_n(HEALTH_RECENT_ERRORS),
            durable_cache_available: self.cache.is_durable_available(),
            timestamp: self.clock.now(),
        }
    }
}
