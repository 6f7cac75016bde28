//! Error types for the market data crate.
//!
//! Every adapter failure surfaces as a [`MarketDataError`]. The registry never
//! retries an adapter; it records the error and moves on to the next provider,
//! so the variants here exist for diagnostics rather than control flow.

use thiserror::Error;

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol exists but the provider returned no points for the range.
    #[error("No data for date range")]
    NoDataForRange,

    /// The provider signalled a rate limit, either by status code or in a 200 body.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The adapter needs an API key and none was configured.
    #[error("API key not configured: {provider}")]
    MissingApiKey {
        /// The provider missing its key
        provider: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}: {message}")]
    Http {
        /// The provider that returned the status
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The provider answered 200 but the body could not be understood.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The provider that returned the body
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// A provider-specific error reported inside the response body.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The operation is not offered by this provider.
    #[error("{operation} not supported by {provider}")]
    NotSupported {
        /// The operation that was requested
        operation: String,
        /// The provider that lacks it
        provider: String,
    },

    /// No registered provider advertises the requested capability.
    #[error("No providers available")]
    NoProvidersAvailable,

    /// All capable providers were tried and all failed.
    #[error("All providers failed")]
    AllProvidersFailed,

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// HTTP status code attached to this error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the provider asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_carries_status() {
        let error = MarketDataError::Http {
            provider: "Yahoo Finance".to_string(),
            status: 502,
            message: "Bad Gateway".to_string(),
        };
        assert_eq!(error.status_code(), Some(502));
    }

    #[test]
    fn test_rate_limited_reports_429() {
        let error = MarketDataError::RateLimited {
            provider: "Alpha Vantage".to_string(),
        };
        assert_eq!(error.status_code(), Some(429));
        assert!(error.is_rate_limited());
    }

    #[test]
    fn test_symbol_not_found_has_no_status() {
        let error = MarketDataError::SymbolNotFound("NOPE".to_string());
        assert_eq!(error.status_code(), None);
        assert!(!error.is_rate_limited());
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::RateLimited {
            provider: "Finnhub".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: Finnhub");

        let error = MarketDataError::ProviderError {
            provider: "Alpha Vantage".to_string(),
            message: "Invalid API call".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Provider error: Alpha Vantage - Invalid API call"
        );

        let error = MarketDataError::MissingApiKey {
            provider: "Finnhub".to_string(),
        };
        assert_eq!(format!("{}", error), "API key not configured: Finnhub");
    }

    #[test]
    fn test_multi_field_display() {
        let error = MarketDataError::Http {
            provider: "Stooq".to_string(),
            status: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 404 from Stooq: Not Found");

        let error = MarketDataError::NotSupported {
            operation: "news".to_string(),
            provider: "Alpha Vantage".to_string(),
        };
        assert_eq!(error.to_string(), "news not supported by Alpha Vantage");
    }
}
