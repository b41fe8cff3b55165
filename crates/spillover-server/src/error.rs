use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use spillover_core::TreeError;

/// Error body returned by every route: `{ "error": ..., "kind": ... }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn missing_token() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "auth_failure", "Access denied")
    }

    pub fn invalid_token() -> Self {
        Self::new(StatusCode::FORBIDDEN, "auth_failure", "Invalid token")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "Server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl From<TreeError> for ApiError {
    fn from(err: TreeError) -> Self {
        let status = match &err {
            TreeError::InvalidInput(_)
            | TreeError::SponsorNotFound(_)
            | TreeError::PositionUnavailable { .. }
            | TreeError::SlotOccupied { .. }
            | TreeError::AuthFailure => StatusCode::BAD_REQUEST,
            TreeError::Conflict(_) => StatusCode::CONFLICT,
            TreeError::NotFound(_) => StatusCode::NOT_FOUND,
            TreeError::Storage(detail) => {
                tracing::error!(detail = %detail, "storage fault");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        // A lost slot race is retried inside the engine; if one ever leaks out
        // it reads as an exhausted placement.
        let kind = match &err {
            TreeError::SlotOccupied { .. } => "position_unavailable",
            other => other.kind(),
        };
        Self::new(status, kind, err.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}
