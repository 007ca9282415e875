//! Error type for HTTP handlers.
//!
//! Bridges the core's typed errors to HTTP responses: every error leaves
//! the server as a stable `{code, message}` JSON body with the status
//! code matching the error kind.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pickup_core::CoreError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to the client)
    source: Option<anyhow::Error>,
}

impl ApiError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach a source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => Self::not_found(entity, id),
            CoreError::Conflict(message) => Self::conflict(message),
            CoreError::Forbidden(message) => Self::forbidden(message),
            CoreError::Validation(message) => Self::validation(message),
            CoreError::Storage(message) => {
                Self::internal("An internal error occurred").with_source(anyhow::anyhow!(message))
            }
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let err = ApiError::conflict("already joined");
        assert_eq!(err.to_string(), "[CONFLICT] already joined");
    }

    #[test]
    fn core_error_kinds_map_to_status_codes() {
        let err: ApiError = CoreError::not_found("event", "123").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: ApiError = CoreError::conflict("full").into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError = CoreError::forbidden("not the host").into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err: ApiError = CoreError::validation("bad input").into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = CoreError::Storage("db down".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        // Backend detail is logged, never echoed to the client.
        assert_eq!(err.message, "An internal error occurred");
    }
}
