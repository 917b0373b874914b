use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hnld_core::errors::{BackendError, Error as CoreError};
use hnld_core::fx::FxError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

const UPSTREAM_MESSAGE: &str = "Exchange rate service is temporarily unavailable";

fn core_status(err: &CoreError) -> (StatusCode, String) {
    match err {
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CoreError::Fx(fx) => match fx {
            FxError::InvalidCurrency(_) => (StatusCode::BAD_REQUEST, fx.to_string()),
            FxError::RateNotFound(_) => (StatusCode::NOT_FOUND, fx.to_string()),
            FxError::Provider { .. } | FxError::InvalidRate(_) => {
                (StatusCode::BAD_GATEWAY, UPSTREAM_MESSAGE.to_string())
            }
            FxError::CacheError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        },
        CoreError::NotFound { .. } | CoreError::Backend(BackendError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        CoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        CoreError::InsufficientBalance { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        CoreError::Backend(BackendError::PermissionDenied(_)) => {
            (StatusCode::FORBIDDEN, err.to_string())
        }
        CoreError::Backend(BackendError::Unavailable(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Backend is temporarily unavailable".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Core(e) => core_status(e),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
        };
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "Request rejected: {}", self);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
