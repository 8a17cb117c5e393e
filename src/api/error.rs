//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::prediction::PredictionError;

/// Error response body: `{success: false, error, code}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

impl ErrorBody {
    pub fn new(code: &'static str, error: String) -> Self {
        Self {
            success: false,
            error,
            code,
        }
    }
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(PredictionError),
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("{0}")]
    GenerationFailed(String),
    #[error("Request exceeded the {0} s deadline")]
    Timeout(u64),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::ModelUnavailable(_)
            | ApiError::GenerationFailed(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body shared by single responses and per-row batch failures.
    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::BadRequest(detail) => ErrorBody::new("BAD_REQUEST", detail.clone()),
            ApiError::Validation(e) => ErrorBody::new(e.code(), e.to_string()),
            ApiError::ModelUnavailable(detail) => {
                tracing::error!(detail, "Prediction requested without a loaded model");
                ErrorBody::new("MODEL_UNAVAILABLE", "Model is not loaded".to_string())
            }
            ApiError::GenerationFailed(detail) => {
                ErrorBody::new("GENERATION_FAILED", detail.clone())
            }
            ApiError::Timeout(_) => ErrorBody::new("TIMEOUT", self.to_string()),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                ErrorBody::new("INTERNAL", "An internal error occurred".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match err {
            e if e.is_validation() => ApiError::Validation(e),
            PredictionError::ModelUnavailable(detail) => ApiError::ModelUnavailable(detail),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {err}"))
    }
}
