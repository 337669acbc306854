//! Animal observation endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/animal/data` | Create one observation |
//! | `POST` | `/animal/data/batch` | Create many observations |
//! | `GET` | `/animal/data` | Merged listing with optional filters |
//! | `GET` | `/animal/data/cow/{cow_id}` | Listing for one animal |
//! | `GET` | `/animal/data/response/{response_type}` | Listing for one category |
//! | `GET` | `/animal/data/{entry_id}` | Single observation |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use lewas_core::time::parse_instant;
use lewas_core::{AnimalFilter, ListPage, NewAnimalObservation};
use lewas_types::{AnimalObservation, EntryId, Source};
use validator::Validate;

use super::PageParams;
use crate::error::ApiError;
use crate::extract::QueryParams;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for creating an observation.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct AnimalDataInput {
    /// The observed animal.
    #[validate(length(min = 1))]
    pub cow_id: String,
    /// Behavior category.
    #[validate(length(min = 1))]
    pub response_type: String,
    /// Observation time; now when omitted.
    pub time: Option<String>,
    /// Ingestion source; `manual` when omitted.
    pub source: Option<Source>,
}

impl AnimalDataInput {
    fn into_new(self) -> Result<NewAnimalObservation, ApiError> {
        self.validate()?;
        let now = Utc::now();
        let time = self
            .time
            .as_deref()
            .map(|t| parse_instant(t, now.date_naive()))
            .transpose()?;
        Ok(NewAnimalObservation {
            cow_id: self.cow_id,
            response_type: self.response_type,
            time,
            source: self.source,
        })
    }
}

/// Optional listing filters for `GET /animal/data`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct AnimalListQuery {
    /// Only this animal.
    pub cow_id: Option<String>,
    /// Only this behavior category.
    pub response_type: Option<String>,
}

/// A page of observations.
#[derive(Debug, serde::Serialize)]
pub struct AnimalListResponse {
    /// Observations, newest first.
    pub data: Vec<AnimalObservation>,
    /// Number of observations in `data`.
    pub count: usize,
    /// Token for the next page.
    pub next_token: Option<String>,
    /// Unfiltered table size, when requested.
    pub total: Option<u64>,
}

impl From<ListPage<AnimalObservation>> for AnimalListResponse {
    fn from(page: ListPage<AnimalObservation>) -> Self {
        Self {
            count: page.items.len(),
            data: page.items,
            next_token: page.next_token,
            total: page.total,
        }
    }
}

/// Summary returned by `POST /animal/data/batch`.
#[derive(Debug, serde::Serialize)]
pub struct BatchResponse {
    /// Human-readable outcome.
    pub message: String,
    /// IDs of the stored observations.
    pub entry_ids: Vec<EntryId>,
    /// Number stored.
    pub successful: usize,
    /// Number rejected or failed.
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// POST /animal/data
// ---------------------------------------------------------------------------

/// Create one observation.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnimalDataInput>,
) -> Result<impl IntoResponse, ApiError> {
    let new = body.into_new()?;
    let record = state.animals.create(new, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// ---------------------------------------------------------------------------
// POST /animal/data/batch
// ---------------------------------------------------------------------------

/// Create many observations. Items that fail validation are counted as
/// failed; the batch itself never fails on a bad item.
pub async fn create_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Vec<AnimalDataInput>>,
) -> impl IntoResponse {
    let mut valid = Vec::with_capacity(body.len());
    let mut rejected: usize = 0;
    for item in body {
        match item.into_new() {
            Ok(new) => valid.push(new),
            Err(e) => {
                tracing::warn!(error = %e, "Rejected animal observation in batch");
                rejected = rejected.saturating_add(1);
            }
        }
    }

    let summary = state.animals.create_batch(valid, Utc::now()).await;
    let failed = summary.failed.saturating_add(rejected);

    (
        StatusCode::CREATED,
        Json(BatchResponse {
            message: format!(
                "Successfully created {} animal data entries (failed: {failed})",
                summary.successful
            ),
            entry_ids: summary.entry_ids,
            successful: summary.successful,
            failed,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /animal/data and filtered variants
// ---------------------------------------------------------------------------

/// Merged listing across sources.
pub async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(filter): QueryParams<AnimalListQuery>,
    QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<AnimalListResponse>, ApiError> {
    let filter = AnimalFilter {
        cow_id: filter.cow_id,
        response_type: filter.response_type,
    };
    list_filtered(&state, &filter, page).await
}

/// Listing for one animal.
pub async fn list_by_cow(
    State(state): State<Arc<AppState>>,
    Path(cow_id): Path<String>,
    QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<AnimalListResponse>, ApiError> {
    let filter = AnimalFilter {
        cow_id: Some(cow_id),
        response_type: None,
    };
    list_filtered(&state, &filter, page).await
}

/// Listing for one behavior category.
pub async fn list_by_response(
    State(state): State<Arc<AppState>>,
    Path(response_type): Path<String>,
    QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<AnimalListResponse>, ApiError> {
    let filter = AnimalFilter {
        cow_id: None,
        response_type: Some(response_type),
    };
    list_filtered(&state, &filter, page).await
}

async fn list_filtered(
    state: &AppState,
    filter: &AnimalFilter,
    page: PageParams,
) -> Result<Json<AnimalListResponse>, ApiError> {
    let request = page.into_request(Utc::now())?;
    let page = state.animals.list(filter, &request).await?;
    Ok(Json(page.into()))
}

// ---------------------------------------------------------------------------
// GET /animal/data/{entry_id}
// ---------------------------------------------------------------------------

/// Single observation by ID.
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<AnimalObservation>, ApiError> {
    let entry_id: EntryId = id_str
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid entry ID '{id_str}': {e}")))?;
    Ok(Json(state.animals.get(entry_id).await?))
}
