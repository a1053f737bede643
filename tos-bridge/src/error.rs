//! HTTP error mapping for tos-bridge

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Unparseable query or path parameter (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Common(#[from] tos_common::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use tos_common::Error as E;
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Common(err) => match err {
                E::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                E::InvalidStateTransition { .. } => (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION"),
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
        let (status, code) = self.parts();
        let message = self.to_string();

        if status.is_server_error() {
            error!(code, error = %message, "Request failed");
        }

        (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
