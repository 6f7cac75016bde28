//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all adapters implement
//! - Provider capability flags
//! - Concrete adapters (Yahoo Finance, Finnhub, Alpha Vantage)
//!
//! # Architecture
//!
//! The provider system is designed to be:
//! - **Provider-agnostic**: The registry doesn't know about specific providers
//! - **Extensible**: New providers can be added by implementing `MarketDataProvider`
//! - **Isolated**: An adapter owns its wire format; nothing upstream-specific leaks out

mod capabilities;
mod traits;

pub mod alpha_vantage;
pub mod finnhub;
pub mod yahoo;

/// Browser-like user agent; Yahoo rejects requests without one.
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

// Re-exports
pub use capabilities::{Capability, ProviderCapabilities};
pub use traits::MarketDataProvider;
