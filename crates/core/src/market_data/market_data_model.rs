use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockwatch_market_data::{ProviderCapabilities, ProviderError};

use crate::historical::ImportSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every provider answered
    Operational,
    /// Some providers answered
    Degraded,
    /// No provider answered
    Down,
}

impl HealthStatus {
    pub fn from_availability(available: &[bool]) -> Self {
        if !available.is_empty() && available.iter().all(|a| *a) {
            HealthStatus::Operational
        } else if available.iter().any(|a| *a) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Down
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub name: String,
    pub available: bool,
    pub priority: u8,
    pub capabilities: ProviderCapabilities,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub providers: Vec<ProviderHealth>,
    pub recent_errors: Vec<ProviderError>,
    pub durable_cache_available: bool,
    pub timestamp: DateTime<Utc>,
}

/// Historical import request: inline CSV, or a network import when absent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub symbol: String,
    pub csv_content: Option<String>,
    pub source: Option<ImportSource>,
    /// Display name for a newly tracked symbol
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status() {
        assert_eq!(HealthStatus::from_availability(&[true, true]), HealthStatus::Operational);
        assert_eq!(HealthStatus::from_availability(&[true, false]), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_availability(&[false, false]), HealthStatus::Down);
        assert_eq!(HealthStatus::from_availability(&[]), HealthStatus::Down);
    }

    #[test]
    fn test_import_request_from_json() {
        let req: ImportRequest =
            serde_json::from_str(r#"{"symbol":"AAPL","csvContent":"Date,Close","source":"manual"}"#)
                .unwrap();
        assert_eq!(req.source, Some(ImportSource::Manual));
        assert!(req.name.is_none());
    }
}
