use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use battle_engine::error::EngineError;

/// Error returned by a route, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unprocessable(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::NotFound(d) | Self::Unprocessable(d) | Self::Conflict(d) | Self::Internal(d) => d,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::SessionNotFound(_) => Self::NotFound("Session not found".into()),
            EngineError::Validation(msg) => Self::Unprocessable(msg),
            EngineError::AlreadyStreaming(_) => Self::Conflict("Session is already streaming".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(detail = self.detail(), "request failed");
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
