use async_trait::async_trait;
use chrono::NaiveDate;
use stockwatch_market_data::{HistoricalPoint, HistoricalRange};

use super::historical_model::{
    BulkUpdateSummary, ImportLogEntry, ImportResult, ImportSource, JobRun,
};
use crate::errors::Result;

/// Persisted daily series keyed by (symbol, date).
#[async_trait]
pub trait HistoricalRepositoryTrait: Send + Sync {
    /// Stored rows in `[from, to]`, ascending by date.
    fn get_history(
        &self,
        symbol: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalPoint>>;

    fn count_for_symbol(&self, symbol: &str) -> Result<usize>;

    fn get_last_date(&self, symbol: &str) -> Result<Option<NaiveDate>>;

    /// Inserts or overwrites rows on (symbol, date). Returns rows written.
    async fn upsert_points(
        &self,
        symbol: &str,
        points: &[HistoricalPoint],
        source: ImportSource,
    ) -> Result<usize>;
}

#[async_trait]
pub trait ImportLogRepositoryTrait: Send + Sync {
    async fn insert_log(&self, entry: ImportLogEntry) -> Result<()>;

    /// Most recent entries first.
    fn recent_logs(&self, limit: usize) -> Result<Vec<ImportLogEntry>>;
}

#[async_trait]
pub trait JobRunRepositoryTrait: Send + Sync {
    async fn create_run(&self, run: &JobRun) -> Result<()>;

    async fn update_run(&self, run: &JobRun) -> Result<()>;

    fn latest_run(&self, job_name: &str) -> Result<Option<JobRun>>;
}

/// Historical import and reconciliation.
///
/// Import operations never fail past this boundary; problems come back as
/// an unsuccessful [`ImportResult`].
#[async_trait]
pub trait HistoricalServiceTrait: Send + Sync {
    fn get_historical_data(
        &self,
        symbol: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<HistoricalPoint>;

    /// Stored rows covering `range`, counted back from today.
    fn get_stored_range(&self, symbol: &str, range: HistoricalRange) -> Vec<HistoricalPoint>;

    fn has_historical_data(&self, symbol: &str) -> bool;

    fn get_last_date(&self, symbol: &str) -> Option<NaiveDate>;

    async fn import_from_csv(&self, symbol: &str, content: &str, source: ImportSource)
        -> ImportResult;

    async fn import_from_yahoo(&self, symbol: &str, start: Option<NaiveDate>) -> ImportResult;

    async fn import_from_stooq(&self, symbol: &str, market: Option<&str>) -> ImportResult;

    async fn smart_import(&self, symbol: &str) -> ImportResult;

    async fn update_symbol(&self, symbol: &str) -> ImportResult;

    async fn update_all_symbols(&self) -> BulkUpdateSummary;

    /// Bulk update wrapped in a recorded job run.
    async fn run_scheduled_update(&self) -> Result<BulkUpdateSummary>;
}
