use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use log::{debug, error, info, warn};
use stockwatch_market_data::{Clock, HistoricalPoint, HistoricalRange};

use super::csv_parser::parse_market_csv;
use super::downloader::{
    format_symbol_for_stooq, stooq_download_url, yahoo_download_url, HistoricalDownloaderTrait,
};
use super::historical_model::{
    BulkUpdateSummary, ImportConfig, ImportLogEntry, ImportResult, ImportSource, ImportStatus,
    ImportType, JobRun, JobRunStatus,
};
use super::historical_traits::{
    HistoricalRepositoryTrait, HistoricalServiceTrait, ImportLogRepositoryTrait,
    JobRunRepositoryTrait,
};
use crate::errors::Result;
use crate::metadata::MetadataServiceTrait;
use crate::utils::csv_utils::non_empty_lines;
use crate::utils::time_utils;

pub const HISTORICAL_UPDATE_JOB: &str = "update-historical";

pub struct HistoricalImportService {
    repository: Arc<dyn HistoricalRepositoryTrait>,
    import_log: Arc<dyn ImportLogRepositoryTrait>,
    job_runs: Arc<dyn JobRunRepositoryTrait>,
    metadata: Arc<dyn MetadataServiceTrait>,
    downloader: Arc<dyn HistoricalDownloaderTrait>,
    clock: Arc<dyn Clock>,
    config: ImportConfig,
}

impl HistoricalImportService {
    pub fn new(
        repository: Arc<dyn HistoricalRepositoryTrait>,
        import_log: Arc<dyn ImportLogRepositoryTrait>,
        job_runs: Arc<dyn JobRunRepositoryTrait>,
        metadata: Arc<dyn MetadataServiceTrait>,
        downloader: Arc<dyn HistoricalDownloaderTrait>,
        clock: Arc<dyn Clock>,
        config: ImportConfig,
    ) -> Self {
        Self {
            repository,
            import_log,
            job_runs,
            metadata,
            downloader,
            clock,
            config,
        }
    }

    async fn write_log(&self, entry: ImportLogEntry) {
        if let Err(e) = self.import_log.insert_log(entry).await {
            warn!("Failed to write import log: {}", e);
        }
    }

    /// Updates every active symbol in turn, pausing between them.
    async fn collect_updates(&self) -> Result<BulkUpdateSummary> {
        let symbols = self.metadata.get_active_symbols()?;
        let mut summary = BulkUpdateSummary::default();

        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.config.symbol_delay.is_zero() {
                tokio::time::sleep(self.config.symbol_delay).await;
            }
            let result = self.update_symbol(symbol).await;
            if let Some(err) = &result.error {
                warn!("Update of {} failed: {}", symbol, err);
            }
            summary.push(result);
        }

        Ok(summary)
    }

    fn market_for(&self, symbol: &str) -> Option<String> {
        match self.metadata.get_metadata(symbol) {
            Ok(meta) => meta.and_then(|m| m.country),
            Err(e) => {
                debug!("No metadata for {}: {}", symbol, e);
                None
            }
        }
    }
}

#[async_trait]
impl HistoricalServiceTrait for HistoricalImportService {
    fn get_historical_data(
        &self,
        symbol: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<HistoricalPoint> {
        match self
            .repository
            .get_history(&symbol.trim().to_uppercase(), from, to)
        {
            Ok(points) => points,
            Err(e) if e.is_unavailable() => {
                warn!("Historical table not available: {}", e);
                Vec::new()
            }
            Err(e) => {
                error!("Error reading historical data for {}: {}", symbol, e);
                Vec::new()
            }
        }
    }

    fn get_stored_range(&self, symbol: &str, range: HistoricalRange) -> Vec<HistoricalPoint> {
        let from = range.start_date(time_utils::today(self.clock.as_ref()));
        self.get_historical_data(symbol, Some(from), None)
    }

    fn has_historical_data(&self, symbol: &str) -> bool {
        self.repository
            .count_for_symbol(&symbol.trim().to_uppercase())
            .map(|n| n > 0)
            .unwrap_or(false)
    }

    fn get_last_date(&self, symbol: &str) -> Option<NaiveDate> {
        self.repository
            .get_last_date(&symbol.trim().to_uppercase())
            .unwrap_or_else(|e| {
                debug!("No last date for {}: {}", symbol, e);
                None
            })
    }

    async fn import_from_csv(
        &self,
        symbol: &str,
        content: &str,
        source: ImportSource,
    ) -> ImportResult {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return ImportResult::failed(&symbol, "Symbol is required");
        }

        let parsed = parse_market_csv(content, None);
        if parsed.data.is_empty() {
            return ImportResult::failed(&symbol, "No valid data found in CSV");
        }

        let data_lines = non_empty_lines(content.trim()).len().saturating_sub(1);
        let skipped = data_lines.saturating_sub(parsed.row_count);

        let imported = match self
            .repository
            .upsert_points(&symbol, &parsed.data, source)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                error!("Storing historical data for {} failed: {}", symbol, e);
                return ImportResult::failed(&symbol, e.to_string());
            }
        };

        info!(
            "Imported {} rows for {} from {} ({} skipped)",
            imported, symbol, source, skipped
        );

        self.write_log(ImportLogEntry {
            import_type: source.import_type(),
            symbols: vec![symbol.clone()],
            records_imported: imported,
            records_skipped: skipped,
            records_failed: 0,
            date_from: parsed.date_range.map(|r| r.from),
            date_to: parsed.date_range.map(|r| r.to),
            status: ImportStatus::Completed,
            error_message: None,
            completed_at: self.clock.now(),
        })
        .await;

        ImportResult {
            success: true,
            symbol,
            records_imported: imported,
            records_skipped: skipped,
            records_failed: 0,
            date_range: parsed.date_range,
            error: None,
        }
    }

    async fn import_from_yahoo(&self, symbol: &str, start: Option<NaiveDate>) -> ImportResult {
        let start = start
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        let url = yahoo_download_url(
            &self.config.yahoo_download_url,
            symbol.trim(),
            start,
            self.clock.now(),
        );

        match self.downloader.fetch_text(&url).await {
            Ok(body) => {
                self.import_from_csv(symbol, &body, ImportSource::YahooCsv)
                    .await
            }
            Err(e) => ImportResult::failed(symbol, format!("Yahoo Finance download failed: {}", e)),
        }
    }

    async fn import_from_stooq(&self, symbol: &str, market: Option<&str>) -> ImportResult {
        let market = market
            .map(str::to_string)
            .or_else(|| self.market_for(symbol));
        let stooq_symbol = format_symbol_for_stooq(symbol, market.as_deref());
        let url = stooq_download_url(&self.config.stooq_download_url, &stooq_symbol);

        let body = match self.downloader.fetch_text(&url).await {
            Ok(body) => body,
            Err(e) => {
                return ImportResult::failed(symbol, format!("Stooq download failed: {}", e))
            }
        };

        if non_empty_lines(body.trim()).len() < 2 {
            return ImportResult::failed(symbol, "No data returned from Stooq");
        }

        self.import_from_csv(symbol, &body, ImportSource::StooqCsv)
            .await
    }

    async fn smart_import(&self, symbol: &str) -> ImportResult {
        debug!("Smart import for {}: trying Yahoo", symbol);
        let yahoo = self.import_from_yahoo(symbol, None).await;
        if yahoo.has_records() {
            return yahoo;
        }

        debug!("Smart import for {}: trying Stooq", symbol);
        let stooq = self.import_from_stooq(symbol, None).await;
        if stooq.has_records() {
            return stooq;
        }

        warn!("All historical sources failed for {}", symbol);
        ImportResult::failed(
            symbol,
            format!(
                "All data sources failed (Yahoo: {}; Stooq: {})",
                yahoo.error.unwrap_or_else(|| "no records".to_string()),
                stooq.error.unwrap_or_else(|| "no records".to_string())
            ),
        )
    }

    async fn update_symbol(&self, symbol: &str) -> ImportResult {
        let Some(last_date) = self.get_last_date(symbol) else {
            return self.smart_import(symbol).await;
        };

        let today = time_utils::today(self.clock.as_ref());
        if last_date >= today {
            debug!("{} is up to date ({})", symbol, last_date);
            return ImportResult::up_to_date(symbol);
        }

        let start = last_date.checked_add_days(Days::new(1));
        self.import_from_yahoo(symbol, start).await
    }

    async fn update_all_symbols(&self) -> BulkUpdateSummary {
        self.collect_updates().await.unwrap_or_else(|e| {
            error!("Could not load active symbols: {}", e);
            BulkUpdateSummary::default()
        })
    }

    async fn run_scheduled_update(&self) -> Result<BulkUpdateSummary> {
        let mut run = JobRun::start(HISTORICAL_UPDATE_JOB, self.clock.now());
        if let Err(e) = self.job_runs.create_run(&run).await {
            warn!("Failed to record job start: {}", e);
        }

        let outcome = self.collect_updates().await;
        run.completed_at = Some(self.clock.now());

        match &outcome {
            Ok(summary) => {
                run.status = JobRunStatus::Completed;
                run.symbols_processed = summary.total;
                run.symbols_failed = summary.failed;
                run.error_messages = summary
                    .results
                    .iter()
                    .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {}", r.symbol, e)))
                    .collect();

                let imported = summary.results.iter().map(|r| r.records_imported).sum();
                self.write_log(ImportLogEntry {
                    import_type: ImportType::ApiDaily,
                    symbols: summary.results.iter().map(|r| r.symbol.clone()).collect(),
                    records_imported: imported,
                    records_skipped: 0,
                    records_failed: summary.failed,
                    date_from: None,
                    date_to: None,
                    status: if summary.failed == 0 {
                        ImportStatus::Completed
                    } else {
                        ImportStatus::Partial
                    },
                    error_message: None,
                    completed_at: self.clock.now(),
                })
                .await;

                info!(
                    "Historical update finished: {} symbols, {} ok, {} failed",
                    summary.total, summary.success, summary.failed
                );
            }
            Err(e) => {
                run.status = JobRunStatus::Failed;
                run.error_messages = vec![e.to_string()];
                error!("Historical update failed: {}", e);
            }
        }

        if let Err(e) = self.job_runs.update_run(&run).await {
            warn!("Failed to record job completion: {}", e);
        }
        outcome
    }
}
