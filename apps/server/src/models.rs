use serde::{Deserialize, Serialize};
use stockwatch_core::cache::CacheKind;
use stockwatch_core::historical::ImportSource;
use stockwatch_core::market_data::ImportRequest;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SymbolQuery {
    /// Ticker, e.g. `AAPL` or `SAP.DE`
    pub symbol: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct HistoricalQuery {
    pub symbol: Option<String>,
    /// `1d`, `5d`, `1mo`, `3mo`, `ytd`, `1y`, `5y` or `max`. Defaults to `1y`.
    pub range: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct InvalidateQuery {
    /// Limit to one kind: `quote`, `fundamentals`, `historical` or `news`
    #[param(value_type = Option<String>)]
    pub kind: Option<CacheKind>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImportHistoricalRequest {
    pub symbol: String,
    /// Inline CSV. Omit to import from the network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_content: Option<String>,
    /// `manual`, `yahoo_csv` or `stooq_csv`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub source: Option<ImportSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<ImportHistoricalRequest> for ImportRequest {
    fn from(r: ImportHistoricalRequest) -> Self {
        Self {
            symbol: r.symbol,
            csv_content: r.csv_content,
            source: r.source,
            name: r.name,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub removed: usize,
}
