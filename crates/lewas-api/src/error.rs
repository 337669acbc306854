//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body has the shape `{"error": "...", "status": 400}`.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lewas_core::CoreError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request is malformed or names unknown reference data.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// No API key was presented.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The presented API key is wrong.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidToken | CoreError::InvalidInput(_) => {
                Self::BadRequest(err.to_string())
            }
            CoreError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            CoreError::Store(_) | CoreError::Serialization(_) => {
                tracing::error!(error = %err, "Request failed");
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (CoreError::InvalidToken, StatusCode::BAD_REQUEST),
            (CoreError::InvalidInput("x".to_owned()), StatusCode::BAD_REQUEST),
            (CoreError::NotFound("entry 1".to_owned()), StatusCode::NOT_FOUND),
            (
                CoreError::Store(lewas_db::DbError::Config("down".to_owned())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(
            ApiError::Unauthorized("API Key header not found".to_owned())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("Invalid API Key".to_owned())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
    }
}
