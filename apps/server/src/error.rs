use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stockwatch_core::errors::{DatabaseError, Error as CoreError};
use stockwatch_core::market_data::PROVIDERS_UNAVAILABLE_MESSAGE;
use stockwatch_market_data::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    /// Every capable provider failed.
    #[error("Market data is {}", PROVIDERS_UNAVAILABLE_MESSAGE)]
    ProvidersUnavailable(Vec<ProviderError>),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ProviderError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Core(e) => match e {
                CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::Database(DatabaseError::Unavailable(_)) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                CoreError::Database(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ProvidersUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let message = self.to_string();
        let errors = match self {
            ApiError::ProvidersUnavailable(errors) => errors,
            _ => Vec::new(),
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message,
            errors,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stockwatch_core::errors::ValidationError;

    #[test]
    fn test_status_mapping() {
        let missing: ApiError = CoreError::from(ValidationError::MissingField("symbol".into())).into();
        assert_eq!(missing.into_response().status(), StatusCode::BAD_REQUEST);

        let exhausted = ApiError::ProvidersUnavailable(Vec::new());
        assert_eq!(exhausted.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let cron = ApiError::Unauthorized("Invalid cron secret".into());
        assert_eq!(cron.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_unavailable_message() {
        let err = ApiError::ProvidersUnavailable(Vec::new());
        assert_eq!(err.to_string(), "Market data is temporarily unavailable, retry later");
    }
}
