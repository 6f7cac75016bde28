//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration and priority ordering
//! - Capability-filtered fallback across providers
//! - Per-request and process-wide provider error tracking
//! - Concurrent health checks

mod diagnostics;
mod registry;

pub use diagnostics::{ProviderError, ProviderErrorLog, ServiceResponse, ERROR_LOG_CAPACITY};
pub use registry::{ProviderInfo, ProviderRegistry, RECENT_ERRORS};
