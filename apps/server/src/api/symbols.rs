use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use stockwatch_core::metadata::StockMetadata;
use utoipa::IntoParams;

use crate::{error::ApiResult, main_lib::AppState};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Matched against symbol, name and ISIN
    #[serde(default)]
    q: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/symbols/search",
    params(SearchQuery),
    responses((status = 200, description = "Tracked symbols matching the query"))
)]
pub async fn search_symbols(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<StockMetadata>>> {
    let found = state.metadata_service.search_symbols(&query.q)?;
    Ok(Json(found))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/symbols/search", get(search_symbols))
}
