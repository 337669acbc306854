//! Sensor observation endpoints, all under `/v1/sensors`.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/observations` | Store one reading |
//! | `POST` | `/observations/batch` | Store many readings |
//! | `GET` | `/observations` | Merged listing across instruments |
//! | `GET` | `/latest` | Newest reading per instrument |
//! | `GET` | `/metadata` | Reference tables |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use lewas_core::sensor::{DEFAULT_LATEST_LIMIT, FailedObservation};
use lewas_core::{NewSensorObservation, Sample, SensorFilter, SensorMetadata, SensorObservationView};
use rust_decimal::Decimal;
use validator::Validate;

use super::PageParams;
use crate::error::ApiError;
use crate::extract::QueryParams;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Sample description in a submitted reading.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct SampleInput {
    /// Medium, e.g. `water`.
    #[validate(length(min = 1, message = "Sample must include a 'medium' field"))]
    pub medium: String,
    /// Metric name.
    #[validate(length(min = 1, message = "Sample must include a 'metric' field"))]
    pub metric: String,
    /// Optional meta cell name.
    #[serde(default)]
    pub meta: Option<String>,
}

/// Request body for one reading.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct SensorObservationInput {
    /// Reading time: RFC 3339, naive ISO (UTC) or `HH:MM:SS` (today, UTC).
    #[validate(length(min = 1))]
    pub timestamp: String,
    /// What was sampled.
    #[validate(nested)]
    pub sample: SampleInput,
    /// Instrument name.
    #[validate(length(min = 1))]
    pub instrument: String,
    /// Unit abbreviation.
    #[validate(length(min = 1))]
    pub unit: String,
    /// Measured value (number or decimal string).
    pub value: Decimal,
    /// Standard error.
    #[serde(default)]
    pub stderr: Option<Decimal>,
}

impl From<SensorObservationInput> for NewSensorObservation {
    fn from(input: SensorObservationInput) -> Self {
        Self {
            timestamp: input.timestamp,
            sample: Sample {
                medium: input.sample.medium,
                metric: input.sample.metric,
                meta: input.sample.meta,
            },
            instrument: input.instrument,
            unit: input.unit,
            value: input.value,
            stderr: input.stderr,
        }
    }
}

/// Name-based filters for `GET /v1/sensors/observations`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct SensorListQuery {
    /// Instrument name.
    pub instrument: Option<String>,
    /// Metric name; requires `medium`.
    pub metric: Option<String>,
    /// Medium.
    pub medium: Option<String>,
    /// Unit abbreviation.
    pub unit: Option<String>,
}

/// Query parameters for `GET /v1/sensors/latest`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct LatestQuery {
    /// Maximum number of instruments (default 10).
    pub limit: Option<i64>,
}

/// A list of readings.
#[derive(Debug, serde::Serialize)]
pub struct ObservationsResponse {
    /// Always `true` for a successful response.
    pub success: bool,
    /// Readings, newest first.
    pub observations: Vec<SensorObservationView>,
    /// Number of readings in `observations`.
    pub count: usize,
    /// Token for the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    /// Unfiltered table size, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Summary returned by `POST /v1/sensors/observations/batch`.
#[derive(Debug, serde::Serialize)]
pub struct SensorBatchResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Number stored.
    pub successful_count: usize,
    /// Number rejected or failed.
    pub failed_count: usize,
    /// The failures, absent when everything was stored.
    pub failed_items: Option<Vec<FailedObservation>>,
}

/// Response body for `GET /v1/sensors/metadata`.
#[derive(Debug, serde::Serialize)]
pub struct MetadataResponse {
    /// Always `true` for a successful response.
    pub success: bool,
    /// The reference tables.
    pub data: SensorMetadata,
}

// ---------------------------------------------------------------------------
// POST /v1/sensors/observations
// ---------------------------------------------------------------------------

/// Store one reading and echo it with resolved reference IDs.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SensorObservationInput>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let view = state
        .sensors
        .process(body.into(), Utc::now().date_naive())
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

// ---------------------------------------------------------------------------
// POST /v1/sensors/observations/batch
// ---------------------------------------------------------------------------

/// Store every reading independently; failures are reported per item.
pub async fn create_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Vec<SensorObservationInput>>,
) -> impl IntoResponse {
    let batch = body.into_iter().map(NewSensorObservation::from).collect();
    let summary = state
        .sensors
        .process_batch(batch, Utc::now().date_naive())
        .await;

    let successful_count = summary.successful.len();
    let failed_count = summary.failed.len();
    (
        StatusCode::CREATED,
        Json(SensorBatchResponse {
            message: format!(
                "Successfully created {successful_count} observations (failed: {failed_count})"
            ),
            successful_count,
            failed_count,
            failed_items: (!summary.failed.is_empty()).then_some(summary.failed),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/sensors/observations
// ---------------------------------------------------------------------------

/// Merged listing across instruments.
pub async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(filter): QueryParams<SensorListQuery>,
    QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<ObservationsResponse>, ApiError> {
    let request = page.into_request(Utc::now())?;
    let filter = SensorFilter {
        instrument: filter.instrument,
        metric: filter.metric,
        medium: filter.medium,
        unit: filter.unit,
    };
    let page = state.sensors.list(&filter, &request).await?;

    Ok(Json(ObservationsResponse {
        success: true,
        count: page.items.len(),
        observations: page.items,
        next_token: page.next_token,
        total: page.total,
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/sensors/latest
// ---------------------------------------------------------------------------

/// Newest reading of up to `limit` instruments.
pub async fn latest(
    State(state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<LatestQuery>,
) -> Result<Json<ObservationsResponse>, ApiError> {
    let limit = match params.limit {
        None => DEFAULT_LATEST_LIMIT,
        Some(n) => usize::try_from(n)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ApiError::BadRequest(format!("limit must be a positive integer, got {n}")))?,
    };

    let observations = state.sensors.latest(limit).await?;
    Ok(Json(ObservationsResponse {
        success: true,
        count: observations.len(),
        observations,
        next_token: None,
        total: None,
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/sensors/metadata
// ---------------------------------------------------------------------------

/// The instrument, unit and metric reference tables.
pub async fn metadata(State(state): State<Arc<AppState>>) -> Json<MetadataResponse> {
    Json(MetadataResponse {
        success: true,
        data: state.sensors.metadata(),
    })
}
