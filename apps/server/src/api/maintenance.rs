use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, post},
    Json, Router,
};
use stockwatch_core::historical::BulkUpdateSummary;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{CleanupResponse, InvalidateQuery},
};

fn check_cron_secret(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(secret) = state.cron_secret.as_deref() else {
        return Ok(());
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match provided {
        Some(token) if token == secret => Ok(()),
        _ => Err(ApiError::Unauthorized("Invalid cron secret".to_string())),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/cron/update-historical",
    responses(
        (status = 200, description = "Bulk update summary"),
        (status = 401, description = "Missing or wrong bearer token"),
    )
)]
pub async fn run_historical_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<BulkUpdateSummary>> {
    check_cron_secret(&state, &headers)?;
    let summary = state
        .market_data_service
        .run_scheduled_historical_update()
        .await?;
    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/v1/cache/cleanup",
    responses((status = 200, description = "Expired entries removed", body = CleanupResponse))
)]
pub async fn cleanup_cache(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CleanupResponse>> {
    let removed = state.market_data_service.cleanup_cache().await?;
    Ok(Json(CleanupResponse { removed }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cache/{symbol}",
    params(("symbol" = String, Path, description = "Ticker"), InvalidateQuery),
    responses((status = 204, description = "Entries dropped"))
)]
pub async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(q): Query<InvalidateQuery>,
) -> ApiResult<StatusCode> {
    state
        .market_data_service
        .invalidate_cache(&symbol, q.kind)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cron/update-historical", post(run_historical_update))
        .route("/cache/cleanup", post(cleanup_cache))
        .route("/cache/{symbol}", delete(invalidate_cache))
}
