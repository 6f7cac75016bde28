//! Database model for cached payloads.

use diesel::prelude::*;
use std::str::FromStr;

use crate::utils::{format_timestamp, parse_timestamp};
use stockwatch_core::cache::{CacheKind, StoredCacheEntry};

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stock_cache)]
#[diesel(primary_key(cache_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StockCacheDB {
    pub cache_key: String,
    pub kind: String,
    pub symbol: String,
    pub qualifier: Option<String>,
    pub payload: String,
    pub provider: Option<String>,
    pub fetched_at: String,
    pub expires_at: String,
}

impl From<StoredCacheEntry> for StockCacheDB {
    fn from(entry: StoredCacheEntry) -> Self {
        Self {
            cache_key: entry.cache_key,
            kind: entry.kind.as_str().to_string(),
            symbol: entry.symbol,
            qualifier: entry.qualifier,
            payload: entry.payload,
            provider: entry.provider,
            fetched_at: format_timestamp(&entry.fetched_at),
            expires_at: format_timestamp(&entry.expires_at),
        }
    }
}

impl TryFrom<StockCacheDB> for StoredCacheEntry {
    type Error = String;

    fn try_from(row: StockCacheDB) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: CacheKind::from_str(&row.kind)?,
            fetched_at: parse_timestamp(&row.fetched_at),
            expires_at: parse_timestamp(&row.expires_at),
            cache_key: row.cache_key,
            symbol: row.symbol,
            qualifier: row.qualifier,
            payload: row.payload,
            provider: row.provider,
        })
    }
}
