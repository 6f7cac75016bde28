use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use super::model::{StockMetadataChangesetDB, StockMetadataDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::stock_metadata::dsl as metadata_dsl;
use stockwatch_core::metadata::{MetadataRepositoryTrait, MetadataUpdate, StockMetadata};
use stockwatch_core::Result;

pub struct MetadataRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MetadataRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[async_trait]
impl MetadataRepositoryTrait for MetadataRepository {
    fn get_metadata(&self, symbol: &str) -> Result<Option<StockMetadata>> {
        let mut conn = get_connection(&self.pool)?;

        let row = metadata_dsl::stock_metadata
            .filter(metadata_dsl::symbol.eq(normalize(symbol)))
            .select(StockMetadataDB::as_select())
            .first(&mut conn)
            .optional()
            .into_core()?;

        Ok(row.map(StockMetadata::from))
    }

    fn get_active_symbols(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;

        metadata_dsl::stock_metadata
            .filter(metadata_dsl::is_active.eq(true))
            .order(metadata_dsl::symbol.asc())
            .select(metadata_dsl::symbol)
            .load::<String>(&mut conn)
            .into_core()
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<StockMetadata>> {
        let mut conn = get_connection(&self.pool)?;
        // LIKE is case-insensitive for ASCII in SQLite
        let pattern = format!("%{}%", query.trim());

        let rows = metadata_dsl::stock_metadata
            .filter(
                metadata_dsl::symbol
                    .like(&pattern)
                    .or(metadata_dsl::name.like(&pattern))
                    .or(metadata_dsl::isin.like(&pattern)),
            )
            .order(metadata_dsl::symbol.asc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(StockMetadataDB::as_select())
            .load(&mut conn)
            .into_core()?;

        Ok(rows.into_iter().map(StockMetadata::from).collect())
    }

    async fn insert_if_missing(&self, metadata: StockMetadata) -> Result<bool> {
        let row = StockMetadataDB::from(metadata);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let inserted = diesel::insert_or_ignore_into(metadata_dsl::stock_metadata)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(inserted > 0)
            })
            .await
    }

    async fn update_metadata(
        &self,
        symbol: &str,
        update: &MetadataUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let symbol = normalize(symbol);
        let changes = StockMetadataChangesetDB::from_update(update, updated_at);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(metadata_dsl::stock_metadata.find(symbol))
                    .set(&changes)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn set_active(&self, symbol: &str, active: bool) -> Result<()> {
        let symbol = normalize(symbol);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(metadata_dsl::stock_metadata.find(symbol))
                    .set(metadata_dsl::is_active.eq(active))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }
}
