use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stockwatch_market_data::HistoricalPoint;

/// Dialect of a market-data CSV.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvSource {
    Yahoo,
    Stooq,
    Unknown,
}

/// Where imported rows came from. Stored with each historical row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    #[default]
    Manual,
    YahooCsv,
    StooqCsv,
}

impl ImportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSource::Manual => "manual",
            ImportSource::YahooCsv => "yahoo_csv",
            ImportSource::StooqCsv => "stooq_csv",
        }
    }

    pub fn import_type(&self) -> ImportType {
        match self {
            ImportSource::Manual => ImportType::CsvManual,
            ImportSource::YahooCsv => ImportType::CsvYahoo,
            ImportSource::StooqCsv => ImportType::CsvStooq,
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of import recorded in the import log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    CsvManual,
    CsvYahoo,
    CsvStooq,
    ApiDaily,
}

impl ImportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::CsvManual => "csv_manual",
            ImportType::CsvYahoo => "csv_yahoo",
            ImportType::CsvStooq => "csv_stooq",
            ImportType::ApiDaily => "api_daily",
        }
    }
}

impl FromStr for ImportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv_manual" => Ok(ImportType::CsvManual),
            "csv_yahoo" => Ok(ImportType::CsvYahoo),
            "csv_stooq" => Ok(ImportType::CsvStooq),
            "api_daily" => Ok(ImportType::ApiDaily),
            other => Err(format!("Unknown import type: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Range spanned by an ascending series.
    pub fn of(points: &[HistoricalPoint]) -> Option<Self> {
        match (points.first(), points.last()) {
            (Some(first), Some(last)) => Some(Self {
                from: first.date,
                to: last.date,
            }),
            _ => None,
        }
    }
}

/// Parsed market-data CSV.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketCsvParseResult {
    pub source: CsvSource,
    /// Ascending by date, one row per date
    pub data: Vec<HistoricalPoint>,
    pub row_count: usize,
    pub date_range: Option<DateRange>,
}

/// Outcome of one import, whatever path produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub symbol: String,
    pub records_imported: usize,
    pub records_skipped: usize,
    pub records_failed: usize,
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    pub fn failed(symbol: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            symbol: symbol.to_uppercase(),
            records_imported: 0,
            records_skipped: 0,
            records_failed: 0,
            date_range: None,
            error: Some(error.into()),
        }
    }

    /// Nothing to do: stored data is already current.
    pub fn up_to_date(symbol: &str) -> Self {
        Self {
            success: true,
            error: None,
            ..Self::failed(symbol, String::new())
        }
    }

    /// Succeeded with at least one row.
    pub fn has_records(&self) -> bool {
        self.success && self.records_imported > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Started,
    Completed,
    Failed,
    Partial,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Started => "started",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
            ImportStatus::Partial => "partial",
        }
    }
}

impl FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(ImportStatus::Started),
            "completed" => Ok(ImportStatus::Completed),
            "failed" => Ok(ImportStatus::Failed),
            "partial" => Ok(ImportStatus::Partial),
            other => Err(format!("Unknown import status: {}", other)),
        }
    }
}

/// Row of the import log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportLogEntry {
    pub import_type: ImportType,
    pub symbols: Vec<String>,
    pub records_imported: usize,
    pub records_skipped: usize,
    pub records_failed: usize,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: ImportStatus,
    pub error_message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Aggregate of a bulk update over all active symbols.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<ImportResult>,
}

impl BulkUpdateSummary {
    pub fn push(&mut self, result: ImportResult) {
        self.total += 1;
        if result.success {
            self.success += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobRunStatus {
    Started,
    Completed,
    Failed,
}

impl JobRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobRunStatus::Started => "started",
            JobRunStatus::Completed => "completed",
            JobRunStatus::Failed => "failed",
        }
    }
}

impl FromStr for JobRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(JobRunStatus::Started),
            "completed" => Ok(JobRunStatus::Completed),
            "failed" => Ok(JobRunStatus::Failed),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

/// One execution of a scheduled job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRun {
    pub id: String,
    pub job_name: String,
    pub status: JobRunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub symbols_processed: usize,
    pub symbols_failed: usize,
    pub error_messages: Vec<String>,
}

impl JobRun {
    pub fn start(job_name: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_name: job_name.to_string(),
            status: JobRunStatus::Started,
            started_at,
            completed_at: None,
            symbols_processed: 0,
            symbols_failed: 0,
            error_messages: Vec::new(),
        }
    }
}

/// Settings for the network import paths.
#[derive(Clone, Debug)]
pub struct ImportConfig {
    /// Pause between symbols in a bulk update
    pub symbol_delay: Duration,
    pub user_agent: String,
    pub yahoo_download_url: String,
    pub stooq_download_url: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            symbol_delay: Duration::from_secs(1),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            yahoo_download_url: "https://query1.finance.yahoo.com/v7/finance/download".to_string(),
            stooq_download_url: "https://stooq.com/q/d/l/".to_string(),
        }
    }
}
