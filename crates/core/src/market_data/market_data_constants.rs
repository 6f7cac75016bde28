/// Provider label for series served from the local store
pub const DATA_SOURCE_DATABASE: &str = "database";

/// Fewer stored rows than this triggers an automatic import
pub const MIN_STORED_POINTS: usize = 5;

/// Provider errors included in a health report
pub const HEALTH_RECENT_ERRORS: usize = 5;

/// Shown when every provider failed
pub const PROVIDERS_UNAVAILABLE_MESSAGE: &str = "temporarily unavailable, retry later";
