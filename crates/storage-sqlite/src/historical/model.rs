//! Database models for historical rows, import log entries and job runs.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::warn;
use std::str::FromStr;

use crate::utils::{format_date, format_timestamp, parse_date, parse_timestamp};
use stockwatch_core::historical::{
    ImportLogEntry, ImportSource, ImportStatus, ImportType, JobRun, JobRunStatus,
};
use stockwatch_market_data::HistoricalPoint;

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stock_historical)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StockHistoricalDB {
    pub symbol: String,
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub adjusted_close: Option<f64>,
    pub volume: Option<i64>,
    pub source: String,
    pub updated_at: String,
}

impl StockHistoricalDB {
    pub fn from_point(
        symbol: &str,
        point: &HistoricalPoint,
        source: ImportSource,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            date: format_date(&point.date),
            open: point.open,
            high: point.high,
            low: point.low,
            close: point.close,
            adjusted_close: point.adjusted_close,
            volume: point.volume.map(|v| i64::try_from(v).unwrap_or(i64::MAX)),
            source: source.as_str().to_string(),
            updated_at: format_timestamp(&updated_at),
        }
    }

    /// `None` when the stored date is unreadable.
    pub fn into_point(self) -> Option<HistoricalPoint> {
        let Some(date) = parse_date(&self.date) else {
            warn!("Skipping {} row with bad date '{}'", self.symbol, self.date);
            return None;
        };
        Some(HistoricalPoint {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            adjusted_close: self.adjusted_close,
            volume: self.volume.and_then(|v| u64::try_from(v).ok()),
        })
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::data_import_log)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DataImportLogDB {
    pub id: i32,
    pub import_type: String,
    pub symbols: String,
    pub records_imported: i32,
    pub records_skipped: i32,
    pub records_failed: i32,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub completed_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::data_import_log)]
pub struct NewDataImportLogDB {
    pub import_type: String,
    pub symbols: String,
    pub records_imported: i32,
    pub records_skipped: i32,
    pub records_failed: i32,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub completed_at: String,
}

fn count_to_db(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn count_from_db(count: i32) -> usize {
    usize::try_from(count).unwrap_or(0)
}

impl TryFrom<&ImportLogEntry> for NewDataImportLogDB {
    type Error = serde_json::Error;

    fn try_from(entry: &ImportLogEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            import_type: entry.import_type.as_str().to_string(),
            symbols: serde_json::to_string(&entry.symbols)?,
            records_imported: count_to_db(entry.records_imported),
            records_skipped: count_to_db(entry.records_skipped),
            records_failed: count_to_db(entry.records_failed),
            date_from: entry.date_from.as_ref().map(format_date),
            date_to: entry.date_to.as_ref().map(format_date),
            status: entry.status.as_str().to_string(),
            error_message: entry.error_message.clone(),
            completed_at: format_timestamp(&entry.completed_at),
        })
    }
}

impl TryFrom<DataImportLogDB> for ImportLogEntry {
    type Error = String;

    fn try_from(row: DataImportLogDB) -> Result<Self, Self::Error> {
        Ok(Self {
            import_type: ImportType::from_str(&row.import_type)?,
            symbols: serde_json::from_str(&row.symbols).map_err(|e| e.to_string())?,
            records_imported: count_from_db(row.records_imported),
            records_skipped: count_from_db(row.records_skipped),
            records_failed: count_from_db(row.records_failed),
            date_from: row.date_from.as_deref().and_then(parse_date),
            date_to: row.date_to.as_deref().and_then(parse_date),
            status: ImportStatus::from_str(&row.status)?,
            error_message: row.error_message,
            completed_at: parse_timestamp(&row.completed_at),
        })
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::cron_job_runs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct CronJobRunDB {
    pub id: String,
    pub job_name: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub symbols_processed: i32,
    pub symbols_failed: i32,
    pub error_messages: Option<String>,
}

impl TryFrom<&JobRun> for CronJobRunDB {
    type Error = serde_json::Error;

    fn try_from(run: &JobRun) -> Result<Self, Self::Error> {
        let error_messages = if run.error_messages.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&run.error_messages)?)
        };
        Ok(Self {
            id: run.id.clone(),
            job_name: run.job_name.clone(),
            status: run.status.as_str().to_string(),
            started_at: format_timestamp(&run.started_at),
            completed_at: run.completed_at.as_ref().map(format_timestamp),
            symbols_processed: count_to_db(run.symbols_processed),
            symbols_failed: count_to_db(run.symbols_failed),
            error_messages,
        })
    }
}

impl TryFrom<CronJobRunDB> for JobRun {
    type Error = String;

    fn try_from(row: CronJobRunDB) -> Result<Self, Self::Error> {
        let error_messages = match row.error_messages.as_deref() {
            Some(json) => serde_json::from_str(json).map_err(|e| e.to_string())?,
            None => Vec::new(),
        };
        Ok(Self {
            status: JobRunStatus::from_str(&row.status)?,
            started_at: parse_timestamp(&row.started_at),
            completed_at: row.completed_at.as_deref().map(parse_timestamp),
            symbols_processed: count_from_db(row.symbols_processed),
            symbols_failed: count_from_db(row.symbols_failed),
            error_messages,
            id: row.id,
            job_name: row.job_name,
        })
    }
}
