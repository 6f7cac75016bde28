use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use stockwatch_core::market_data::HealthReport;

use crate::main_lib::AppState;

#[utoipa::path(get, path = "/api/v1/healthz", responses((status = 200, description = "Liveness")))]
pub async fn healthz() -> &'static str {
    "ok"
}

/// Provider availability, recent failures and cache tier state.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Provider health report"))
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.market_data_service.health().await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/health", get(get_health))
}
