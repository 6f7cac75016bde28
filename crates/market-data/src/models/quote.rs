use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest market quote for one symbol.
///
/// Quotes are never persisted; they only live in the short-TTL cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker as reported by the provider
    pub symbol: String,

    /// Display name, falls back to the symbol
    pub name: String,

    /// Current (last traded) price
    pub price: f64,

    /// Absolute change vs. previous close
    pub change: f64,

    /// Percent change vs. previous close
    pub change_percent: f64,

    /// Previous session close
    pub previous_close: f64,

    pub open: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub volume: u64,

    /// Quote currency
    pub currency: String,

    /// When the quote was fetched
    pub timestamp: DateTime<Utc>,

    /// Name of the provider that supplied it
    pub provider: String,
}

impl Quote {
    /// Create a quote from its price pair.
    ///
    /// `change` and `change_percent` are always derived here from `price` and
    /// `previous_close`, whatever the upstream source reports. Remaining fields
    /// default to the price itself and can be filled in by the adapter.
    pub fn new(
        symbol: impl Into<String>,
        price: f64,
        previous_close: f64,
        provider: impl Into<String>,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            name: symbol.clone(),
            symbol,
            price,
            change: price - previous_close,
            change_percent: change_percent(price, previous_close),
            previous_close,
            open: price,
            day_high: price,
            day_low: price,
            volume: 0,
            currency: "USD".to_string(),
            timestamp: Utc::now(),
            provider: provider.into(),
        }
    }

    /// Re-derive `change` and `change_percent` from the price pair.
    pub fn recompute_change(&mut self) {
        self.change = self.price - self.previous_close;
        self.change_percent = change_percent(self.price, self.previous_close);
    }
}

/// `(price - previous_close) / previous_close * 100`, or 0 without a reference.
pub fn change_percent(price: f64, previous_close: f64) -> f64 {
    if previous_close == 0.0 {
        return 0.0;
    }
    (price - previous_close) / previous_close * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_new_derives_change() {
        let quote = Quote::new("AAPL", 110.0, 100.0, "Yahoo Finance");
        assert_eq!(quote.change, 10.0);
        assert!((quote.change_percent - 10.0).abs() < 1e-9);
        assert_eq!(quote.name, "AAPL");
        assert_eq!(quote.open, 110.0);
    }

    #[test]
    fn test_change_percent_zero_previous_close() {
        assert_eq!(change_percent(12.0, 0.0), 0.0);
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let quote = Quote::new("SAP.DE", 180.0, 175.0, "Finnhub");
        let json = serde_json::to_value(&quote).unwrap();
        assert!(json.get("changePercent").is_some());
        assert!(json.get("previousClose").is_some());
        assert!(json.get("dayHigh").is_some());
    }
}
