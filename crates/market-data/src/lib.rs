//! Stockwatch Market Data Crate
//!
//! This crate fetches quotes, fundamentals, historical series and news from
//! several external providers and unifies them behind one model.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple providers: Yahoo Finance, Finnhub, Alpha Vantage
//! - Capability flags so each adapter only implements what it serves
//! - Priority-ordered fallback with a diagnostic trail
//! - Concurrent, failure-isolated health checks
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |     Caller       |  (cache layer / facade)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! | ProviderRegistry | --> | ProviderErrorLog |  (rolling, last 100)
//! +------------------+     +------------------+
//!          |
//!          v  (filtered by capability, ascending priority)
//! +------------------+
//! |    Provider      |  (Yahoo, Finnhub, Alpha Vantage)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | ServiceResponse  |  (success, data, provider, errors)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Quote`] - Latest price snapshot with derived change
//! - [`FundamentalSnapshot`] - Slow-moving company metrics
//! - [`HistoricalPoint`] / [`HistoricalRange`] - Daily bars and range tokens
//! - [`NewsArticle`] - Company headlines
//! - [`ServiceResponse`] - Uniform result envelope
//! - [`ProviderError`] - One failed provider attempt

pub mod clock;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::MarketDataError;

// Re-export all public types from models
pub use models::{
    change_percent, collapse_intraday, normalize_series, FundamentalSnapshot, HistoricalPoint,
    HistoricalRange, NewsArticle, Quote,
};

// Re-export provider types
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::{Capability, MarketDataProvider, ProviderCapabilities};

// Re-export registry types
pub use registry::{ProviderError, ProviderInfo, ProviderRegistry, ServiceResponse};
