//! Yahoo Finance API response models.
//!
//! The chart endpoint (v8) serves both quotes and historical series; the
//! quoteSummary endpoint (v10) serves fundamentals.

use serde::Deserialize;

// ============================================================================
// Chart API
// ============================================================================

/// Main response wrapper for the chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

#[derive(Debug, Deserialize)]
pub struct YahooChart {
    pub result: Option<Vec<YahooChartResult>>,
    pub error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooApiError {
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YahooChartResult {
    pub meta: YahooChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Option<YahooIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooChartMeta {
    pub symbol: Option<String>,
    pub currency: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub chart_previous_close: Option<f64>,
    pub regular_market_day_high: Option<f64>,
    pub regular_market_day_low: Option<f64>,
    pub regular_market_volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct YahooIndicators {
    #[serde(default)]
    pub quote: Vec<YahooQuoteIndicator>,
    #[serde(default)]
    pub adjclose: Vec<YahooAdjClose>,
}

/// OHLCV columns; Yahoo pads missing bars with nulls
#[derive(Debug, Default, Deserialize)]
pub struct YahooQuoteIndicator {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
pub struct YahooAdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

// ============================================================================
// quoteSummary API
// ============================================================================

/// Main response wrapper for quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResponse {
    pub quote_summary: YahooQuoteSummary,
}

#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummary {
    pub result: Option<Vec<YahooQuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResult {
    pub summary_detail: Option<YahooSummaryDetail>,
    pub default_key_statistics: Option<YahooKeyStatistics>,
}

/// Numeric value with raw and formatted forms.
/// Yahoo sends `{}` when nothing is known, hence `raw` is optional.
#[derive(Debug, Deserialize, Clone)]
pub struct YahooValue {
    pub raw: Option<f64>,
}

/// Helper so callers can write `detail.market_cap.raw()`
pub trait RawValue {
    fn raw(&self) -> Option<f64>;
}

impl RawValue for Option<YahooValue> {
    fn raw(&self) -> Option<f64> {
        self.as_ref().and_then(|v| v.raw)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooSummaryDetail {
    pub market_cap: Option<YahooValue>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<YahooValue>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<YahooValue>,
    pub dividend_yield: Option<YahooValue>,
    pub fifty_two_week_high: Option<YahooValue>,
    pub fifty_two_week_low: Option<YahooValue>,
    pub average_volume: Option<YahooValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooKeyStatistics {
    pub beta: Option<YahooValue>,
    pub trailing_eps: Option<YahooValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_value_object() {
        let detail: YahooSummaryDetail =
            serde_json::from_str(r#"{"marketCap": {}, "trailingPE": {"raw": 28.5, "fmt": "28.50"}}"#)
                .unwrap();
        assert_eq!(detail.market_cap.raw(), None);
        assert_eq!(detail.trailing_pe.raw(), Some(28.5));
        assert_eq!(detail.forward_pe.raw(), None);
    }

    #[test]
    fn test_deserialize_chart_with_null_bars() {
        let json = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "AAPL", "currency": "USD", "regularMarketPrice": 190.1},
                    "timestamp": [1704205800, 1704292200],
                    "indicators": {"quote": [{"close": [185.6, null], "volume": [100, null]}]}
                }],
                "error": null
            }
        }"#;
        let response: YahooChartResponse = serde_json::from_str(json).unwrap();
        let result = &response.chart.result.unwrap()[0];
        assert_eq!(result.timestamp.len(), 2);
        let quote = &result.indicators.as_ref().unwrap().quote[0];
        assert_eq!(quote.close, vec![Some(185.6), None]);
        assert!(quote.open.is_empty());
    }

    #[test]
    fn test_deserialize_chart_error() {
        let json = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let response: YahooChartResponse = serde_json::from_str(json).unwrap();
        assert!(response.chart.result.is_none());
        assert_eq!(response.chart.error.unwrap().code.as_deref(), Some("Not Found"));
    }
}
