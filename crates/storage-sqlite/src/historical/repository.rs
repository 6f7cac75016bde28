use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::dsl::{count_star, max};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::Arc;

use super::model::StockHistoricalDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::stock_historical::dsl as hist_dsl;
use crate::utils::{format_date, parse_date, rows_per_statement};
use stockwatch_core::historical::{HistoricalRepositoryTrait, ImportSource};
use stockwatch_core::Result;
use stockwatch_market_data::HistoricalPoint;

/// Bound parameters per historical row.
const HISTORICAL_COLUMNS: usize = 10;

pub struct HistoricalRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl HistoricalRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl HistoricalRepositoryTrait for HistoricalRepository {
    fn get_history(
        &self,
        symbol: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalPoint>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = hist_dsl::stock_historical
            .filter(hist_dsl::symbol.eq(symbol.trim().to_uppercase()))
            .into_boxed();
        if let Some(from) = from {
            query = query.filter(hist_dsl::date.ge(format_date(&from)));
        }
        if let Some(to) = to {
            query = query.filter(hist_dsl::date.le(format_date(&to)));
        }

        let rows = query
            .order(hist_dsl::date.asc())
            .select(StockHistoricalDB::as_select())
            .load(&mut conn)
            .into_core()?;

        Ok(rows
            .into_iter()
            .filter_map(StockHistoricalDB::into_point)
            .collect())
    }

    fn count_for_symbol(&self, symbol: &str) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;

        let count: i64 = hist_dsl::stock_historical
            .filter(hist_dsl::symbol.eq(symbol.trim().to_uppercase()))
            .select(count_star())
            .first(&mut conn)
            .into_core()?;

        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn get_last_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let mut conn = get_connection(&self.pool)?;

        let last: Option<String> = hist_dsl::stock_historical
            .filter(hist_dsl::symbol.eq(symbol.trim().to_uppercase()))
            .select(max(hist_dsl::date))
            .first(&mut conn)
            .into_core()?;

        Ok(last.as_deref().and_then(parse_date))
    }

    async fn upsert_points(
        &self,
        symbol: &str,
        points: &[HistoricalPoint],
        source: ImportSource,
    ) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }

        let symbol = symbol.trim().to_uppercase();
        let now = Utc::now();
        let rows: Vec<StockHistoricalDB> = points
            .iter()
            .map(|p| StockHistoricalDB::from_point(&symbol, p, source, now))
            .collect();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut written = 0;
                for chunk in rows.chunks(rows_per_statement(HISTORICAL_COLUMNS)) {
                    written += diesel::replace_into(hist_dsl::stock_historical)
                        .values(chunk)
                        .execute(conn)
                        .into_core()?;
                }
                debug!("Upserted {} historical rows for {}", written, symbol);
                Ok(written)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use tempfile::tempdir;

    async fn create_test_repository() -> (HistoricalRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (HistoricalRepository::new(pool, writer), temp_dir)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn full_point(d: u32, close: f64) -> HistoricalPoint {
        HistoricalPoint {
            date: day(d),
            open: Some(close - 1.0),
            high: Some(close + 1.0),
            low: Some(close - 2.0),
            close,
            adjusted_close: Some(close),
            volume: Some(50_000_000),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (repo, _dir) = create_test_repository().await;
        let points = vec![full_point(2, 185.64), full_point(3, 184.25), full_point(4, 181.91)];

        repo.upsert_points("aapl", &points, ImportSource::YahooCsv).await.unwrap();
        repo.upsert_points("AAPL", &points, ImportSource::YahooCsv).await.unwrap();

        assert_eq!(repo.count_for_symbol("AAPL").unwrap(), 3);
        assert_eq!(repo.get_history("AAPL", None, None).unwrap(), points);
    }

    #[tokio::test]
    async fn test_later_import_overwrites_same_date() {
        let (repo, _dir) = create_test_repository().await;
        repo.upsert_points("SAP.DE", &[HistoricalPoint::close_only(day(2), 100.0)], ImportSource::Manual)
            .await
            .unwrap();
        repo.upsert_points("SAP.DE", &[HistoricalPoint::close_only(day(2), 101.5)], ImportSource::StooqCsv)
            .await
            .unwrap();

        let stored = repo.get_history("SAP.DE", None, None).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].close, 101.5);
        assert!(stored[0].open.is_none());
    }

    #[tokio::test]
    async fn test_range_filters_and_last_date() {
        let (repo, _dir) = create_test_repository().await;
        let points: Vec<HistoricalPoint> = (2..=12)
            .map(|d| HistoricalPoint::close_only(day(d), d as f64))
            .collect();
        repo.upsert_points("MSFT", &points, ImportSource::Manual).await.unwrap();

        let window = repo.get_history("MSFT", Some(day(5)), Some(day(8))).unwrap();
        assert_eq!(window.len(), 4);
        assert_eq!(window.first().unwrap().date, day(5));
        assert_eq!(window.last().unwrap().date, day(8));

        assert_eq!(repo.get_last_date("MSFT").unwrap(), Some(day(12)));
        assert_eq!(repo.get_last_date("IBM").unwrap(), None);
        assert_eq!(repo.count_for_symbol("IBM").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_large_batch_is_chunked() {
        let (repo, _dir) = create_test_repository().await;
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let points: Vec<HistoricalPoint> = (0..1500u64)
            .map(|i| {
                HistoricalPoint::close_only(start.checked_add_days(chrono::Days::new(i)).unwrap(), 1.0)
            })
            .collect();

        let written = repo.upsert_points("BIG", &points, ImportSource::Manual).await.unwrap();
        assert_eq!(written, 1500);
        assert_eq!(repo.count_for_symbol("BIG").unwrap(), 1500);
    }
}
