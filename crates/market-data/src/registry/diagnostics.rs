//! Provider failure tracking and the uniform result envelope.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Default capacity of the rolling error log.
pub const ERROR_LOG_CAPACITY: usize = 100;

/// One failed provider attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderError {
    pub provider: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

impl ProviderError {
    pub fn from_error(provider: &str, error: &MarketDataError, timestamp: DateTime<Utc>) -> Self {
        Self {
            provider: provider.to_string(),
            error: error.to_string(),
            status_code: error.status_code(),
            timestamp,
        }
    }
}

/// Result envelope returned by every resolve operation.
///
/// `errors` holds one entry per provider that failed before the outcome,
/// and is kept even when a later provider succeeded.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default)]
    pub errors: Vec<ProviderError>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T, provider: impl Into<String>, errors: Vec<ProviderError>) -> Self {
        Self {
            success: true,
            data: Some(data),
            provider: Some(provider.into()),
            from_cache: false,
            errors,
        }
    }

    /// Successful response served from cache. The provider is whoever
    /// originally supplied the payload, if known.
    pub fn cached(data: T, provider: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            provider,
            from_cache: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<ProviderError>) -> Self {
        Self {
            success: false,
            data: None,
            provider: None,
            from_cache: false,
            errors,
        }
    }

    /// Transform the payload, keeping provenance and diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServiceResponse<U> {
        ServiceResponse {
            success: self.success,
            data: self.data.map(f),
            provider: self.provider,
            from_cache: self.from_cache,
            errors: self.errors,
        }
    }
}

/// Process-wide rolling buffer of provider failures, oldest first.
#[derive(Debug)]
pub struct ProviderErrorLog {
    entries: Mutex<VecDeque<ProviderError>>,
    capacity: usize,
}

impl Default for ProviderErrorLog {
    fn default() -> Self {
        Self::with_capacity(ERROR_LOG_CAPACITY)
    }
}

impl ProviderErrorLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ProviderError>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Provider error log mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn push(&self, error: ProviderError) {
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(error);
    }

    /// Last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ProviderError> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
