use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::cache_constants::*;

/// Kind of payload held in the cache. Each kind has its own TTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Quote,
    Fundamentals,
    Historical,
    News,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Quote => "quote",
            CacheKind::Fundamentals => "fundamentals",
            CacheKind::Historical => "historical",
            CacheKind::News => "news",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quote" => Ok(CacheKind::Quote),
            "fundamentals" => Ok(CacheKind::Fundamentals),
            "historical" => Ok(CacheKind::Historical),
            "news" => Ok(CacheKind::News),
            other => Err(format!("Unknown cache kind: {}", other)),
        }
    }
}

/// Identity of a cached payload.
///
/// The symbol is upper-cased on construction, so lookups are
/// case-insensitive on symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub symbol: String,
    pub qualifier: Option<String>,
}

impl CacheKey {
    pub fn new(kind: CacheKind, symbol: &str, qualifier: Option<&str>) -> Self {
        Self {
            kind,
            symbol: symbol.trim().to_uppercase(),
            qualifier: qualifier.filter(|q| !q.is_empty()).map(str::to_string),
        }
    }
}

impl fmt::Display for CacheKey {
    /// `kind:SYMBOL[:qualifier]`, also the durable primary key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind, CACHE_KEY_SEPARATOR, self.symbol)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{}{}", CACHE_KEY_SEPARATOR, qualifier)?;
        }
        Ok(())
    }
}

/// A cache hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    pub provider: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Row of the durable tier. The payload is JSON text.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredCacheEntry {
    pub cache_key: String,
    pub kind: CacheKind,
    pub symbol: String,
    pub qualifier: Option<String>,
    pub payload: String,
    pub provider: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Whether a disabled durable tier is ever tried again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DurableReprobePolicy {
    /// Once disabled, stay memory-only until restart.
    #[default]
    Never,
    /// Try the durable tier again after this long.
    After(std::time::Duration),
}

/// Cache settings.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub quote_ttl: Duration,
    pub fundamentals_ttl: Duration,
    pub historical_ttl: Duration,
    pub news_ttl: Duration,
    pub reprobe: DurableReprobePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            quote_ttl: Duration::seconds(QUOTE_TTL_SECS),
            fundamentals_ttl: Duration::seconds(FUNDAMENTALS_TTL_SECS),
            historical_ttl: Duration::seconds(HISTORICAL_TTL_SECS),
            news_ttl: Duration::seconds(NEWS_TTL_SECS),
            reprobe: DurableReprobePolicy::Never,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Quote => self.quote_ttl,
            CacheKind::Fundamentals => self.fundamentals_ttl,
            CacheKind::Historical => self.historical_ttl,
            CacheKind::News => self.news_ttl,
        }
    }
}
