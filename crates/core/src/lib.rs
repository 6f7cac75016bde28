//! Stockwatch Core - Domain entities, services, and traits.
//!
//! This crate contains the market data logic for Stockwatch: the two-tier
//! cache, historical imports, symbol metadata, trailing performance, broker
//! CSV parsing and the facade tying them to the provider registry.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod broker_import;
pub mod cache;
pub mod errors;
pub mod historical;
pub mod market_data;
pub mod metadata;
pub mod performance;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
