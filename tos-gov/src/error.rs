//! HTTP error mapping for tos-gov
//!
//! Every handler returns [`ApiResult`]; the common error taxonomy maps onto
//! status codes here and nowhere else.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request outside the domain validators (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// tos-common error
    #[error(transparent)]
    Common(#[from] tos_common::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use tos_common::Error as E;
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Common(err) => match err {
                E::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                E::InvalidStateTransition { .. } => {
                    (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
                }
                E::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
                E::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                E::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
                E::Database(_) | E::Io(_) | E::Config(_) | E::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let message = self.to_string();

        if status.is_server_error() {
            error!(code = error_code, error = %message, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
