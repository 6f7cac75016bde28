use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    config::Config,
    main_lib::AppState,
    models::{CleanupResponse, ImportHistoricalRequest},
};

pub mod health;
pub mod import;
pub mod maintenance;
pub mod market_data;
pub mod symbols;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        health::get_health,
        market_data::get_quote,
        market_data::get_fundamentals,
        market_data::get_historical,
        market_data::get_performance,
        market_data::get_news,
        symbols::search_symbols,
        import::import_historical,
        import::parse_broker_csv,
        maintenance::run_historical_update,
        maintenance::cleanup_cache,
        maintenance::invalidate_cache,
    ),
    components(schemas(ImportHistoricalRequest, CleanupResponse)),
    tags((name = "stockwatch"))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allow.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any);
    }
    let origins = config
        .cors_allow
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect::<Vec<_>>();
    CorsLayer::new().allow_origin(origins)
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(market_data::router())
        .merge(symbols::router())
        .merge(import::router())
        .merge(maintenance::router())
        .route("/openapi.json", get(openapi_json));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(cors_layer(config))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
