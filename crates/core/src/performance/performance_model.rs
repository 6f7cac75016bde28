use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Trailing window a return is reported for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformancePeriod {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "1Y")]
    OneYear,
}

impl PerformancePeriod {
    pub const ALL: [PerformancePeriod; 6] = [
        PerformancePeriod::OneDay,
        PerformancePeriod::OneWeek,
        PerformancePeriod::OneMonth,
        PerformancePeriod::ThreeMonths,
        PerformancePeriod::YearToDate,
        PerformancePeriod::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformancePeriod::OneDay => "1D",
            PerformancePeriod::OneWeek => "1W",
            PerformancePeriod::OneMonth => "1M",
            PerformancePeriod::ThreeMonths => "3M",
            PerformancePeriod::YearToDate => "YTD",
            PerformancePeriod::OneYear => "1Y",
        }
    }

    /// Day whose close serves as the reference price.
    ///
    /// Year-to-date looks back to January 1st, so the reference is the last
    /// close of the previous year.
    pub fn lookback_date(&self, today: NaiveDate) -> NaiveDate {
        let target = match self {
            PerformancePeriod::OneDay => today.checked_sub_days(Days::new(1)),
            PerformancePeriod::OneWeek => today.checked_sub_days(Days::new(7)),
            PerformancePeriod::OneMonth => today.checked_sub_months(Months::new(1)),
            PerformancePeriod::ThreeMonths => today.checked_sub_months(Months::new(3)),
            PerformancePeriod::YearToDate => NaiveDate::from_ymd_opt(today.year(), 1, 1),
            PerformancePeriod::OneYear => today.checked_sub_months(Months::new(12)),
        };
        target.unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for PerformancePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodChange {
    pub period: PerformancePeriod,
    pub reference_date: NaiveDate,
    pub reference_price: f64,
    pub change: f64,
    pub change_percent: f64,
}

/// Trailing returns of one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    pub symbol: String,
    pub current_price: f64,
    /// Date of the close used as current price
    pub as_of: NaiveDate,
    /// In [`PerformancePeriod::ALL`] order
    pub periods: Vec<PeriodChange>,
}

impl PerformanceData {
    pub fn period(&self, period: PerformancePeriod) -> Option<&PeriodChange> {
        self.periods.iter().find(|p| p.period == period)
    }
}
