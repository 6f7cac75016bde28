use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use stockwatch_core::performance::PerformanceData;
use stockwatch_market_data::{
    FundamentalSnapshot, HistoricalPoint, HistoricalRange, NewsArticle, Quote, ServiceResponse,
};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{HistoricalQuery, SymbolQuery},
};

/// Passes a successful envelope through and turns provider exhaustion into a 503.
fn into_result<T>(response: ServiceResponse<T>) -> ApiResult<Json<ServiceResponse<T>>> {
    if response.success {
        Ok(Json(response))
    } else {
        Err(ApiError::ProvidersUnavailable(response.errors))
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/quote",
    params(SymbolQuery),
    responses(
        (status = 200, description = "Latest quote"),
        (status = 400, description = "Missing symbol"),
        (status = 503, description = "No provider could answer"),
    )
)]
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolQuery>,
) -> ApiResult<Json<ServiceResponse<Quote>>> {
    let response = state
        .market_data_service
        .resolve_quote(q.symbol.as_deref().unwrap_or_default())
        .await?;
    into_result(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/fundamentals",
    params(SymbolQuery),
    responses(
        (status = 200, description = "Fundamental snapshot"),
        (status = 400, description = "Missing symbol"),
        (status = 503, description = "No provider could answer"),
    )
)]
pub async fn get_fundamentals(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolQuery>,
) -> ApiResult<Json<ServiceResponse<FundamentalSnapshot>>> {
    let response = state
        .market_data_service
        .resolve_fundamentals(q.symbol.as_deref().unwrap_or_default())
        .await?;
    into_result(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/historical",
    params(HistoricalQuery),
    responses(
        (status = 200, description = "Daily series, oldest first"),
        (status = 400, description = "Missing symbol or unknown range"),
        (status = 503, description = "No stored rows and no provider could answer"),
    )
)]
pub async fn get_historical(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoricalQuery>,
) -> ApiResult<Json<ServiceResponse<Vec<HistoricalPoint>>>> {
    let range = match q.range.as_deref() {
        Some(token) => HistoricalRange::from_str(token).map_err(ApiError::BadRequest)?,
        None => HistoricalRange::OneYear,
    };
    let response = state
        .market_data_service
        .resolve_historical(q.symbol.as_deref().unwrap_or_default(), range)
        .await?;
    into_result(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/performance",
    params(SymbolQuery),
    responses(
        (status = 200, description = "Trailing returns"),
        (status = 400, description = "Missing symbol"),
        (status = 503, description = "No history available"),
    )
)]
pub async fn get_performance(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolQuery>,
) -> ApiResult<Json<ServiceResponse<PerformanceData>>> {
    let response = state
        .market_data_service
        .resolve_performance(q.symbol.as_deref().unwrap_or_default())
        .await?;
    into_result(response)
}

/// Company news. Provider failures yield an empty list.
#[utoipa::path(
    get,
    path = "/api/v1/news",
    params(SymbolQuery),
    responses(
        (status = 200, description = "Articles, possibly empty"),
        (status = 400, description = "Missing symbol"),
    )
)]
pub async fn get_news(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SymbolQuery>,
) -> ApiResult<Json<Vec<NewsArticle>>> {
    let response = state
        .market_data_service
        .resolve_news(q.symbol.as_deref().unwrap_or_default())
        .await?;
    if !response.success {
        tracing::debug!("News unavailable: {} provider errors", response.errors.len());
    }
    Ok(Json(response.data.unwrap_or_default()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quote", get(get_quote))
        .route("/fundamentals", get(get_fundamentals))
        .route("/historical", get(get_historical))
        .route("/performance", get(get_performance))
        .route("/news", get(get_news))
}
