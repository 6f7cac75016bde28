use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use stockwatch_market_data::Clock;

use super::cache_model::{
    CacheConfig, CacheEntry, CacheKey, CacheKind, DurableReprobePolicy, StoredCacheEntry,
};
use super::cache_traits::CacheRepositoryTrait;
use crate::errors::{Error, Result};

#[derive(Clone, Debug)]
struct MemoryEntry {
    kind: CacheKind,
    symbol: String,
    payload: Value,
    provider: Option<String>,
    fetched_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// State of the durable tier. It moves to `Disabled` on the first
/// structural failure and only moves back under a re-probe policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DurableState {
    Available,
    Disabled { since: DateTime<Utc> },
}

/// Two-tier cache: an in-process map in front of a durable keyed store.
///
/// Expiry is lazy. An expired entry is never returned and is dropped from
/// memory when touched; [`StockCache::cleanup`] reclaims the rest.
pub struct StockCache {
    memory: DashMap<String, MemoryEntry>,
    repository: Arc<dyn CacheRepositoryTrait>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    durable: Mutex<DurableState>,
}

impl StockCache {
    pub fn new(
        repository: Arc<dyn CacheRepositoryTrait>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            memory: DashMap::new(),
            repository,
            clock,
            config,
            durable: Mutex::new(DurableState::Available),
        }
    }

    /// Returns a live entry, checking memory first and then the durable tier.
    pub fn get<T: DeserializeOwned>(
        &self,
        kind: CacheKind,
        symbol: &str,
        qualifier: Option<&str>,
    ) -> Option<CacheEntry<T>> {
        let key = CacheKey::new(kind, symbol, qualifier).to_string();
        let now = self.clock.now();

        let memory_hit = self.memory.get(&key).map(|e| e.value().clone());
        if let Some(entry) = memory_hit {
            if now < entry.expires_at {
                debug!("Memory cache hit for {}", key);
                return decode(&key, entry);
            }
            self.memory.remove(&key);
        }

        if !self.durable_enabled() {
            return None;
        }

        match self.repository.get_entry(&key) {
            Ok(Some(stored)) if now < stored.expires_at => {
                let payload = match serde_json::from_str::<Value>(&stored.payload) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Discarding unreadable cache payload for {}: {}", key, e);
                        return None;
                    }
                };
                debug!("Durable cache hit for {}", key);
                let entry = MemoryEntry {
                    kind,
                    symbol: stored.symbol,
                    payload,
                    provider: stored.provider,
                    fetched_at: stored.fetched_at,
                    expires_at: stored.expires_at,
                };
                self.memory.insert(key.clone(), entry.clone());
                decode(&key, entry)
            }
            Ok(_) => {
                debug!("Cache miss for {}", key);
                None
            }
            Err(e) => {
                self.handle_durable_error("read", e);
                None
            }
        }
    }

    /// Stores a payload in both tiers with the TTL of its kind.
    pub async fn set<T: Serialize>(
        &self,
        kind: CacheKind,
        symbol: &str,
        data: &T,
        provider: Option<&str>,
        qualifier: Option<&str>,
    ) -> Result<()> {
        let key = CacheKey::new(kind, symbol, qualifier);
        let key_str = key.to_string();
        let fetched_at = self.clock.now();
        let expires_at = fetched_at + self.config.ttl(kind);
        let payload = serde_json::to_value(data)?;

        self.memory.insert(
            key_str.clone(),
            MemoryEntry {
                kind,
                symbol: key.symbol.clone(),
                payload: payload.clone(),
                provider: provider.map(str::to_string),
                fetched_at,
                expires_at,
            },
        );

        if !self.durable_enabled() {
            return Ok(());
        }

        let stored = StoredCacheEntry {
            cache_key: key_str,
            kind,
            symbol: key.symbol,
            qualifier: key.qualifier,
            payload: payload.to_string(),
            provider: provider.map(str::to_string),
            fetched_at,
            expires_at,
        };
        if let Err(e) = self.repository.upsert_entry(stored).await {
            self.handle_durable_error("write", e);
        }
        Ok(())
    }

    /// Drops a symbol's entries, all kinds unless one is given.
    pub async fn invalidate(&self, symbol: &str, kind: Option<CacheKind>) -> Result<()> {
        let symbol = symbol.trim().to_uppercase();
        self.memory
            .retain(|_, e| !(e.symbol == symbol && kind.map_or(true, |k| k == e.kind)));

        if self.durable_enabled() {
            if let Err(e) = self.repository.delete_for_symbol(&symbol, kind).await {
                self.handle_durable_error("delete", e);
            }
        }
        Ok(())
    }

    /// Purges expired entries from both tiers and returns how many went.
    pub async fn cleanup(&self) -> Result<usize> {
        let now = self.clock.now();
        let before = self.memory.len();
        self.memory.retain(|_, e| now < e.expires_at);
        let mut removed = before.saturating_sub(self.memory.len());

        if self.durable_enabled() {
            match self.repository.delete_expired(now).await {
                Ok(n) => removed += n,
                Err(e) => self.handle_durable_error("cleanup", e),
            }
        }

        info!("Cache cleanup removed {} expired entries", removed);
        Ok(removed)
    }

    /// False once the durable tier has been switched off.
    pub fn is_durable_available(&self) -> bool {
        matches!(*self.lock_state(), DurableState::Available)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DurableState> {
        self.durable.lock().unwrap_or_else(|poisoned| {
            warn!("Durable cache state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn durable_enabled(&self) -> bool {
        let mut state = self.lock_state();
        match (*state, self.config.reprobe) {
            (DurableState::Available, _) => true,
            (DurableState::Disabled { .. }, DurableReprobePolicy::Never) => false,
            (DurableState::Disabled { since }, DurableReprobePolicy::After(wait)) => {
                let elapsed = (self.clock.now() - since).to_std().unwrap_or_default();
                if elapsed >= wait {
                    info!("Re-probing durable cache tier");
                    *state = DurableState::Available;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn handle_durable_error(&self, operation: &str, err: Error) {
        if !err.is_unavailable() {
            error!("Durable cache {} failed: {}", operation, err);
            return;
        }

        let mut state = self.lock_state();
        if *state == DurableState::Available {
            warn!(
                "Durable cache unavailable ({}), continuing memory-only",
                err
            );
            *state = DurableState::Disabled {
                since: self.clock.now(),
            };
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, entry: MemoryEntry) -> Option<CacheEntry<T>> {
    match serde_json::from_value(entry.payload) {
        Ok(data) => Some(CacheEntry {
            data,
            provider: entry.provider,
            fetched_at: entry.fetched_at,
            expires_at: entry.expires_at,
        }),
        Err(e) => {
            warn!("Cached payload for {} has unexpected shape: {}", key, e);
            None
        }
    }
}
