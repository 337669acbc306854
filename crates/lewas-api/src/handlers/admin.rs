//! Administrative endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use lewas_types::Source;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /admin/animal/backfill-source`.
#[derive(Debug, serde::Deserialize)]
pub struct BackfillRequest {
    /// Source assigned to records stored without one.
    pub source: Source,
}

/// Response body for `POST /admin/animal/backfill-source`.
#[derive(Debug, serde::Serialize)]
pub struct BackfillResponse {
    /// Number of records rewritten.
    pub updated: u64,
}

/// Assign a source to every animal observation stored without one.
pub async fn backfill_source(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BackfillRequest>,
) -> Result<Json<BackfillResponse>, ApiError> {
    tracing::info!(source = %body.source, "Starting source backfill");
    let updated = state.animals.backfill_source(body.source).await?;
    Ok(Json(BackfillResponse { updated }))
}
