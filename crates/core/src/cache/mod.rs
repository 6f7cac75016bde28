//! Two-tier market data cache.

mod cache_constants;
mod cache_model;
mod cache_service;
mod cache_traits;

pub use cache_constants::*;
pub use cache_model::{
    CacheConfig, CacheEntry, CacheKey, CacheKind, DurableReprobePolicy, StoredCacheEntry,
};
pub use cache_service::StockCache;
pub use cache_traits::CacheRepositoryTrait;
