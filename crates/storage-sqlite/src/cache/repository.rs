use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use std::sync::Arc;

use super::model::StockCacheDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::stock_cache::dsl as cache_dsl;
use crate::utils::format_timestamp;
use stockwatch_core::cache::{CacheKind, CacheRepositoryTrait, StoredCacheEntry};
use stockwatch_core::Result;

pub struct CacheRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CacheRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl CacheRepositoryTrait for CacheRepository {
    fn get_entry(&self, cache_key: &str) -> Result<Option<StoredCacheEntry>> {
        let mut conn = get_connection(&self.pool)?;

        let row = cache_dsl::stock_cache
            .filter(cache_dsl::cache_key.eq(cache_key))
            .select(StockCacheDB::as_select())
            .first(&mut conn)
            .optional()
            .into_core()?;

        Ok(row.and_then(|row| match StoredCacheEntry::try_from(row) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Ignoring cache row '{}': {}", cache_key, e);
                None
            }
        }))
    }

    async fn upsert_entry(&self, entry: StoredCacheEntry) -> Result<()> {
        let row = StockCacheDB::from(entry);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::replace_into(cache_dsl::stock_cache)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn delete_for_symbol(&self, symbol: &str, kind: Option<CacheKind>) -> Result<usize> {
        let symbol = symbol.trim().to_uppercase();
        let kind = kind.map(|k| k.as_str().to_string());

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let for_symbol = cache_dsl::stock_cache.filter(cache_dsl::symbol.eq(&symbol));
                let deleted = match kind {
                    Some(kind) => diesel::delete(for_symbol.filter(cache_dsl::kind.eq(kind)))
                        .execute(conn),
                    None => diesel::delete(for_symbol).execute(conn),
                }
                .into_core()?;
                debug!("Deleted {} cache rows for {}", deleted, symbol);
                Ok(deleted)
            })
            .await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = format_timestamp(&now);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(cache_dsl::stock_cache.filter(cache_dsl::expires_at.le(cutoff)))
                    .execute(conn)
                    .into_core()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn create_test_repository(migrate: bool) -> (CacheRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        if migrate {
            run_migrations(&pool).expect("Failed to run migrations");
        }
        let writer = spawn_writer((*pool).clone());
        (CacheRepository::new(pool, writer), temp_dir)
    }

    fn entry(kind: CacheKind, symbol: &str, qualifier: Option<&str>, ttl_hours: i64) -> StoredCacheEntry {
        let fetched_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut key = format!("{}:{}", kind.as_str(), symbol);
        if let Some(q) = qualifier {
            key.push(':');
            key.push_str(q);
        }
        StoredCacheEntry {
            cache_key: key,
            kind,
            symbol: symbol.to_string(),
            qualifier: qualifier.map(str::to_string),
            payload: r#"{"price":1.0}"#.to_string(),
            provider: Some("Yahoo Finance".to_string()),
            fetched_at,
            expires_at: fetched_at + Duration::hours(ttl_hours),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (repo, _dir) = create_test_repository(true).await;
        let original = entry(CacheKind::Quote, "AAPL", None, 1);
        repo.upsert_entry(original.clone()).await.unwrap();

        let loaded = repo.get_entry("quote:AAPL").unwrap().unwrap();
        assert_eq!(loaded, original);

        let mut replaced = original.clone();
        replaced.payload = r#"{"price":2.0}"#.to_string();
        repo.upsert_entry(replaced).await.unwrap();
        let loaded = repo.get_entry("quote:AAPL").unwrap().unwrap();
        assert_eq!(loaded.payload, r#"{"price":2.0}"#);

        assert!(repo.get_entry("quote:MSFT").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_for_symbol_by_kind() {
        let (repo, _dir) = create_test_repository(true).await;
        repo.upsert_entry(entry(CacheKind::Quote, "SAP.DE", None, 1)).await.unwrap();
        repo.upsert_entry(entry(CacheKind::Historical, "SAP.DE", Some("1y"), 1))
            .await
            .unwrap();
        repo.upsert_entry(entry(CacheKind::Historical, "SAP.DE", Some("5d"), 1))
            .await
            .unwrap();

        let deleted = repo
            .delete_for_symbol("sap.de", Some(CacheKind::Historical))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(repo.get_entry("quote:SAP.DE").unwrap().is_some());

        assert_eq!(repo.delete_for_symbol("SAP.DE", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (repo, _dir) = create_test_repository(true).await;
        repo.upsert_entry(entry(CacheKind::Quote, "A", None, 1)).await.unwrap();
        repo.upsert_entry(entry(CacheKind::News, "A", None, 2)).await.unwrap();
        repo.upsert_entry(entry(CacheKind::Fundamentals, "A", None, 24)).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        assert_eq!(repo.delete_expired(now).await.unwrap(), 2);
        assert!(repo.get_entry("fundamentals:A").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_table_is_unavailable() {
        let (repo, _dir) = create_test_repository(false).await;

        let read = repo.get_entry("quote:AAPL").unwrap_err();
        assert!(read.is_unavailable(), "got {:?}", read);

        let write = repo
            .upsert_entry(entry(CacheKind::Quote, "AAPL", None, 1))
            .await
            .unwrap_err();
        assert!(write.is_unavailable(), "got {:?}", write);
    }
}
