//! Market data module - the facade over cache, local store and providers.

mod market_data_constants;
mod market_data_model;
mod market_data_service;
mod market_data_traits;

#[cfg(test)]
mod market_data_service_tests;

pub use market_data_constants::*;
pub use market_data_model::{HealthReport, HealthStatus, ImportRequest, ProviderHealth};
pub use market_data_service::MarketDataService;
pub use market_data_traits::MarketDataServiceTrait;
