//! Error types shared by the Stockwatch crates.
//!
//! The storage layer turns Diesel and r2d2 failures into [`DatabaseError`]
//! before they reach this crate, so nothing here depends on a database.

use thiserror::Error;

pub use stockwatch_market_data::MarketDataError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    /// A download or CSV import could not produce rows.
    #[error("Import failed: {0}")]
    Import(String),

    /// Cache payloads that cannot be encoded as JSON.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// True when the backing table or feature does not exist.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Database(DatabaseError::Unavailable(_)))
    }
}

/// Storage failures, carried as strings.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// The table backing this operation does not exist, e.g. a cache table
    /// that was never migrated. Callers may degrade instead of failing.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Required field '{0}' is missing")]
    MissingField(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Import(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unavailable() {
        let err: Error = DatabaseError::Unavailable("no such table: stock_cache".into()).into();
        assert!(err.is_unavailable());

        let err: Error = DatabaseError::QueryFailed("syntax error".into()).into();
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_json_failure_is_not_a_validation_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization failed"));
    }

    #[test]
    fn test_io_failure_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "I/O error: read-only");
    }

    #[test]
    fn test_missing_field_message() {
        let err: Error = ValidationError::MissingField("symbol".into()).into();
        assert_eq!(
            err.to_string(),
            "Input validation failed: Required field 'symbol' is missing"
        );
    }
}
