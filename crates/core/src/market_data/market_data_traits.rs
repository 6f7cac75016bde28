use async_trait::async_trait;
use stockwatch_market_data::{
    FundamentalSnapshot, HistoricalPoint, HistoricalRange, NewsArticle, Quote, ServiceResponse,
};

use super::market_data_model::{HealthReport, ImportRequest};
use crate::cache::CacheKind;
use crate::errors::Result;
use crate::historical::{BulkUpdateSummary, ImportResult};
use crate::performance::PerformanceData;

/// Entry point for callers outside the core.
///
/// Resolve operations return `Err` only for invalid input; provider
/// failures come back inside the [`ServiceResponse`].
#[async_trait]
pub trait MarketDataServiceTrait: Send + Sync {
    async fn resolve_quote(&self, symbol: &str) -> Result<ServiceResponse<Quote>>;

    async fn resolve_fundamentals(&self, symbol: &str)
        -> Result<ServiceResponse<FundamentalSnapshot>>;

    async fn resolve_historical(
        &self,
        symbol: &str,
        range: HistoricalRange,
    ) -> Result<ServiceResponse<Vec<HistoricalPoint>>>;

    async fn resolve_performance(&self, symbol: &str) -> Result<ServiceResponse<PerformanceData>>;

    async fn resolve_news(&self, symbol: &str) -> Result<ServiceResponse<Vec<NewsArticle>>>;

    async fn import_historical(&self, request: ImportRequest) -> Result<ImportResult>;

    async fn run_scheduled_historical_update(&self) -> Result<BulkUpdateSummary>;

    async fn cleanup_cache(&self) -> Result<usize>;

    async fn invalidate_cache(&self, symbol: &str, kind: Option<CacheKind>) -> Result<()>;

    async fn health(&self) -> HealthReport;
}
