/// Quotes move constantly.
pub const QUOTE_TTL_SECS: i64 = 5 * 60;

pub const FUNDAMENTALS_TTL_SECS: i64 = 24 * 60 * 60;

pub const HISTORICAL_TTL_SECS: i64 = 6 * 60 * 60;

pub const NEWS_TTL_SECS: i64 = 30 * 60;

/// Separator between the parts of a cache key.
pub const CACHE_KEY_SEPARATOR: char = ':';
