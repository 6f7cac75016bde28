use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use stockwatch_core::broker_import::{self, CsvParseResult};
use stockwatch_core::historical::ImportResult;
use stockwatch_core::utils::csv_utils::decode_content;

use crate::{error::ApiResult, main_lib::AppState, models::ImportHistoricalRequest};

/// Imports inline CSV, or fetches from the network when no CSV is given.
/// An import that could not be understood still answers 200 with `success: false`.
#[utoipa::path(
    post,
    path = "/api/v1/import/historical",
    request_body = ImportHistoricalRequest,
    responses(
        (status = 200, description = "Import outcome"),
        (status = 400, description = "Missing symbol"),
    )
)]
pub async fn import_historical(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImportHistoricalRequest>,
) -> ApiResult<Json<ImportResult>> {
    let result = state
        .market_data_service
        .import_historical(body.into())
        .await?;
    Ok(Json(result))
}

/// Raw upload bytes; non UTF-8 exports are decoded by guessed encoding.
#[utoipa::path(
    post,
    path = "/api/v1/import/broker-csv",
    request_body(content = String, content_type = "text/csv"),
    responses((status = 200, description = "Detected format, positions and raw rows"))
)]
pub async fn parse_broker_csv(body: Bytes) -> Json<CsvParseResult> {
    Json(broker_import::parse_broker_csv(&decode_content(&body)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/import/historical", post(import_historical))
        .route("/import/broker-csv", post(parse_broker_csv))
}
