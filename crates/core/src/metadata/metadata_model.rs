use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    #[default]
    Stock,
    Etf,
    Fund,
    Crypto,
    Other,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Etf => "etf",
            AssetType::Fund => "fund",
            AssetType::Crypto => "crypto",
            AssetType::Other => "other",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stock" => Ok(AssetType::Stock),
            "etf" => Ok(AssetType::Etf),
            "fund" => Ok(AssetType::Fund),
            "crypto" => Ok(AssetType::Crypto),
            "other" => Ok(AssetType::Other),
            other => Err(format!("Unknown asset type: {}", other)),
        }
    }
}

/// Tracked symbol and its descriptive data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMetadata {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub currency: String,
    pub exchange: Option<String>,
    pub country: Option<String>,
    pub isin: Option<String>,
    pub wkn: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub yahoo_symbol: Option<String>,
    pub stooq_symbol: Option<String>,
    pub finnhub_symbol: Option<String>,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
}

/// Partial metadata. `None` fields are left untouched on update and
/// defaulted on insert.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<AssetType>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub country: Option<String>,
    pub isin: Option<String>,
    pub wkn: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub yahoo_symbol: Option<String>,
    pub stooq_symbol: Option<String>,
    pub finnhub_symbol: Option<String>,
}

impl MetadataUpdate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

impl StockMetadata {
    /// New active row for `symbol`, filling gaps in `partial` with defaults.
    ///
    /// Symbols listed on XETRA (`.DE`) default to Germany and EUR, everything
    /// else to the US and USD.
    pub fn with_defaults(symbol: &str, partial: &MetadataUpdate, now: DateTime<Utc>) -> Self {
        let trimmed = symbol.trim();
        let upper = trimmed.to_uppercase();
        let is_de = upper.contains(".DE");
        let (country, currency) = if is_de { ("DE", "EUR") } else { ("US", "USD") };

        Self {
            name: partial.name.clone().unwrap_or_else(|| upper.clone()),
            asset_type: partial.asset_type.unwrap_or_default(),
            currency: partial
                .currency
                .clone()
                .unwrap_or_else(|| currency.to_string()),
            exchange: partial.exchange.clone(),
            country: Some(partial.country.clone().unwrap_or_else(|| country.to_string())),
            isin: partial.isin.clone(),
            wkn: partial.wkn.clone(),
            sector: partial.sector.clone(),
            industry: partial.industry.clone(),
            yahoo_symbol: Some(
                partial
                    .yahoo_symbol
                    .clone()
                    .unwrap_or_else(|| trimmed.to_string()),
            ),
            stooq_symbol: Some(
                partial
                    .stooq_symbol
                    .clone()
                    .unwrap_or_else(|| trimmed.to_lowercase()),
            ),
            finnhub_symbol: Some(
                partial
                    .finnhub_symbol
                    .clone()
                    .unwrap_or_else(|| trimmed.to_string()),
            ),
            is_active: true,
            last_updated: now,
            symbol: upper,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_by_listing() {
        let now = Utc::now();
        let sap = StockMetadata::with_defaults("sap.de", &MetadataUpdate::default(), now);
        assert_eq!(sap.symbol, "SAP.DE");
        assert_eq!(sap.currency, "EUR");
        assert_eq!(sap.country.as_deref(), Some("DE"));
        assert_eq!(sap.stooq_symbol.as_deref(), Some("sap.de"));

        let apple = StockMetadata::with_defaults("AAPL", &MetadataUpdate::named("Apple"), now);
        assert_eq!(apple.name, "Apple");
        assert_eq!(apple.currency, "USD");
        assert_eq!(apple.asset_type, AssetType::Stock);
        assert!(apple.is_active);
    }
}
