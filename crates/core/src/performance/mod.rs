//! Trailing-period returns derived from a stored daily series.

mod performance_calculator;
mod performance_model;

pub use performance_calculator::calculate_performance;
pub use performance_model::{PerformanceData, PerformancePeriod, PeriodChange};
