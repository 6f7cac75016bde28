use chrono::{DateTime, Utc};
use stockwatch_market_data::HistoricalPoint;

use super::performance_model::{PerformanceData, PerformancePeriod, PeriodChange};

/// Close at or before `target`, scanning back from the end of an ascending
/// series. Falls back to the earliest point when the series starts later.
fn reference_point(series: &[HistoricalPoint], target: chrono::NaiveDate) -> Option<&HistoricalPoint> {
    series
        .iter()
        .rev()
        .find(|p| p.date <= target)
        .or_else(|| series.first())
}

/// Trailing returns from an ascending daily series.
///
/// Returns `None` for an empty series.
pub fn calculate_performance(
    symbol: &str,
    series: &[HistoricalPoint],
    now: DateTime<Utc>,
) -> Option<PerformanceData> {
    let current = series.last()?;
    let today = now.date_naive();

    let periods = PerformancePeriod::ALL
        .iter()
        .filter_map(|&period| {
            let reference = reference_point(series, period.lookback_date(today))?;
            let change = current.close - reference.close;
            let change_percent = if reference.close == 0.0 {
                0.0
            } else {
                change / reference.close * 100.0
            };
            Some(PeriodChange {
                period,
                reference_date: reference.date,
                reference_price: reference.close,
                change,
                change_percent,
            })
        })
        .collect();

    Some(PerformanceData {
        symbol: symbol.to_uppercase(),
        current_price: current.close,
        as_of: current.date,
        periods,
    })
}
