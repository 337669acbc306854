//! Extractors whose rejections use the JSON error body.

use axum::extract::FromRequestParts;

use crate::error::ApiError;

/// Query-string extractor; malformed parameters become [`ApiError::BadRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);
