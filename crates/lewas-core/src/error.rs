//! Error type shared by the services.
//!
//! Variants split into two kinds: caller mistakes (`InvalidToken`,
//! `InvalidInput`, `NotFound`) that a retry with corrected input can fix,
//! and store failures that are surfaced verbatim and never retried here.

use lewas_db::DbError;

/// Errors returned by the core services.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The continuation token could not be decoded or names an unknown
    /// partition.
    #[error("invalid pagination token")]
    InvalidToken,

    /// A parameter failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// A continuation token could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
