//! HTTP-facing error type
//!
//! Every error renders as `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::client::CoohomError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Coohom client error
    #[error(transparent)]
    Coohom(#[from] CoohomError),
}

fn coohom_status(err: &CoohomError) -> StatusCode {
    match err {
        CoohomError::Auth { .. } => StatusCode::UNAUTHORIZED,
        CoohomError::Transient { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CoohomError::NotParsed { .. } => StatusCode::CONFLICT,
        CoohomError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CoohomError::Upload(_)
        | CoohomError::StatusUnknown(_)
        | CoohomError::Remote { .. }
        | CoohomError::Http { .. }
        | CoohomError::Network(_)
        | CoohomError::Parse(_) => StatusCode::BAD_GATEWAY,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Coohom(err) => coohom_status(err),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Coohom(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
