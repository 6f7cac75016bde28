//! SQLite storage for historical series, the import log and job runs.

mod import_log_repository;
mod job_run_repository;
mod model;
mod repository;

pub use import_log_repository::ImportLogRepository;
pub use job_run_repository::JobRunRepository;
pub use model::{CronJobRunDB, DataImportLogDB, NewDataImportLogDB, StockHistoricalDB};
pub use repository::HistoricalRepository;
