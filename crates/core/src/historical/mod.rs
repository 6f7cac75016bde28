//! Historical series import and reconciliation.

mod csv_parser;
mod downloader;
mod historical_model;
mod historical_service;
mod historical_traits;

pub use csv_parser::{detect_csv_source, parse_market_csv, parse_stooq_csv, parse_yahoo_csv};
pub use downloader::{
    format_symbol_for_stooq, stooq_download_url, yahoo_download_url, HistoricalDownloaderTrait,
    HttpDownloader,
};
pub use historical_model::{
    BulkUpdateSummary, CsvSource, DateRange, ImportConfig, ImportLogEntry, ImportResult,
    ImportSource, ImportStatus, ImportType, JobRun, JobRunStatus, MarketCsvParseResult,
};
pub use historical_service::{HistoricalImportService, HISTORICAL_UPDATE_JOB};
pub use historical_traits::{
    HistoricalRepositoryTrait, HistoricalServiceTrait, ImportLogRepositoryTrait,
    JobRunRepositoryTrait,
};
