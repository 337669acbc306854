//! REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Module |
//! |--------|------|--------|
//! | `GET` | `/` | this module (public) |
//! | `GET` | `/health` | this module |
//! | `*` | `/animal/data...` | [`animal`] |
//! | `*` | `/v1/sensors/...` | [`sensors`] |
//! | `POST` | `/admin/animal/backfill-source` | [`admin`] |

pub mod admin;
pub mod animal;
pub mod sensors;

use axum::Json;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use lewas_core::time::parse_instant;
use lewas_core::{PageRequest, PageSize, TimeRange};

use crate::error::ApiError;

/// Service name reported by the health check.
pub const SERVICE_NAME: &str = "lewas-api";

/// Paging query parameters shared by every listing endpoint.
#[derive(Debug, Default, serde::Deserialize)]
pub struct PageParams {
    /// Inclusive lower time bound; defaults to `2000-01-01T00:00:00Z`.
    pub start_time: Option<String>,
    /// Inclusive upper time bound; defaults to now.
    pub end_time: Option<String>,
    /// Page size; defaults to 100.
    pub limit: Option<i64>,
    /// Continuation token from a previous page.
    pub next_token: Option<String>,
    /// Also report the unfiltered record count.
    #[serde(default)]
    pub include_total: bool,
}

impl PageParams {
    /// Validate into a [`PageRequest`] relative to `now`.
    pub fn into_request(self, now: DateTime<Utc>) -> Result<PageRequest, ApiError> {
        let today = now.date_naive();
        let start = self
            .start_time
            .as_deref()
            .map(|s| parse_instant(s, today))
            .transpose()?;
        let end = self
            .end_time
            .as_deref()
            .map(|s| parse_instant(s, today))
            .transpose()?;

        Ok(PageRequest {
            range: TimeRange::new(start, end, now)?,
            page_size: PageSize::new(self.limit)?,
            token: self.next_token,
            include_total: self.include_total,
        })
    }
}

// ---------------------------------------------------------------------------
// GET / -- public welcome
// ---------------------------------------------------------------------------

/// Public welcome message.
pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to the LEWAS Lab API. Use the /v1/sensors endpoints for sensor data access.",
    }))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    tracing::debug!("Health check");
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}
