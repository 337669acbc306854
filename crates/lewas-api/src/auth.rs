//! API key middleware.
//!
//! Protected routes require the `X-API-Key` header to equal the
//! configured key. A missing header is `401`, a wrong key is `403`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without the configured API key.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(provided) = request.headers().get(API_KEY_HEADER) else {
        return Err(ApiError::Unauthorized("API Key header not found".to_owned()));
    };

    if provided.as_bytes() != state.api_key.as_bytes() {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return Err(ApiError::Forbidden("Invalid API Key".to_owned()));
    }

    Ok(next.run(request).await)
}
