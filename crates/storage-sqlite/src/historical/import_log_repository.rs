use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::warn;
use std::sync::Arc;

use super::model::{DataImportLogDB, NewDataImportLogDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::data_import_log::dsl as log_dsl;
use stockwatch_core::historical::{ImportLogEntry, ImportLogRepositoryTrait};
use stockwatch_core::Result;

pub struct ImportLogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ImportLogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl ImportLogRepositoryTrait for ImportLogRepository {
    async fn insert_log(&self, entry: ImportLogEntry) -> Result<()> {
        let row = NewDataImportLogDB::try_from(&entry).map_err(StorageError::from)?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(log_dsl::data_import_log)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    fn recent_logs(&self, limit: usize) -> Result<Vec<ImportLogEntry>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = log_dsl::data_import_log
            .order(log_dsl::id.desc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(DataImportLogDB::as_select())
            .load(&mut conn)
            .into_core()?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                ImportLogEntry::try_from(row)
                    .map_err(|e| warn!("Skipping import log row {}: {}", id, e))
                    .ok()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use chrono::{NaiveDate, TimeZone, Utc};
    use stockwatch_core::historical::{ImportStatus, ImportType};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_insert_and_read_back_newest_first() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let repo = ImportLogRepository::new(pool.clone(), spawn_writer((*pool).clone()));

        let first = ImportLogEntry {
            import_type: ImportType::CsvYahoo,
            symbols: vec!["AAPL".to_string()],
            records_imported: 250,
            records_skipped: 2,
            records_failed: 0,
            date_from: NaiveDate::from_ymd_opt(2023, 1, 3),
            date_to: NaiveDate::from_ymd_opt(2023, 12, 29),
            status: ImportStatus::Completed,
            error_message: None,
            completed_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        };
        let second = ImportLogEntry {
            import_type: ImportType::ApiDaily,
            symbols: vec!["AAPL".to_string(), "SAP.DE".to_string()],
            records_imported: 2,
            records_skipped: 0,
            records_failed: 1,
            date_from: None,
            date_to: None,
            status: ImportStatus::Partial,
            error_message: Some("SAP.DE: No data returned from Stooq".to_string()),
            completed_at: Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap(),
        };
        repo.insert_log(first.clone()).await.unwrap();
        repo.insert_log(second.clone()).await.unwrap();

        assert_eq!(repo.recent_logs(10).unwrap(), vec![second.clone(), first]);
        assert_eq!(repo.recent_logs(1).unwrap(), vec![second]);
    }
}
