use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::metadata_model::{MetadataUpdate, StockMetadata};
use crate::errors::Result;

#[async_trait]
pub trait MetadataRepositoryTrait: Send + Sync {
    fn get_metadata(&self, symbol: &str) -> Result<Option<StockMetadata>>;

    fn get_active_symbols(&self) -> Result<Vec<String>>;

    /// Case-insensitive substring match on symbol, name or ISIN.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<StockMetadata>>;

    /// Inserts unless the symbol exists. Returns whether a row was added.
    async fn insert_if_missing(&self, metadata: StockMetadata) -> Result<bool>;

    async fn update_metadata(
        &self,
        symbol: &str,
        update: &MetadataUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn set_active(&self, symbol: &str, active: bool) -> Result<()>;
}

/// Symbol metadata operations. A missing table reads as empty.
#[async_trait]
pub trait MetadataServiceTrait: Send + Sync {
    async fn ensure_metadata_exists(&self, symbol: &str, partial: MetadataUpdate) -> Result<()>;

    fn get_metadata(&self, symbol: &str) -> Result<Option<StockMetadata>>;

    fn get_active_symbols(&self) -> Result<Vec<String>>;

    async fn deactivate_symbol(&self, symbol: &str) -> Result<()>;

    async fn update_metadata(&self, symbol: &str, update: MetadataUpdate) -> Result<()>;

    fn search_symbols(&self, query: &str) -> Result<Vec<StockMetadata>>;
}
