//! Repository traits for the durable cache tier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::cache_model::{CacheKind, StoredCacheEntry};
use crate::errors::Result;

/// Durable keyed store behind the in-process cache.
///
/// Implementations report a missing table as
/// [`DatabaseError::Unavailable`](crate::errors::DatabaseError::Unavailable).
#[async_trait]
pub trait CacheRepositoryTrait: Send + Sync {
    /// Look up an entry by its full key, expired or not.
    fn get_entry(&self, cache_key: &str) -> Result<Option<StoredCacheEntry>>;

    /// Insert or replace the entry with the same key.
    async fn upsert_entry(&self, entry: StoredCacheEntry) -> Result<()>;

    /// Delete every entry of a symbol, optionally only of one kind.
    async fn delete_for_symbol(&self, symbol: &str, kind: Option<CacheKind>) -> Result<usize>;

    /// Delete entries that expired at or before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
