//! Stored observation records.
//!
//! These are the shapes persisted in the key-value store. Request and
//! response shapes live next to the handlers that use them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::Source;
use crate::ids::EntryId;

/// A single animal-behavior observation.
///
/// Immutable once written. The only mutation ever applied is the one-time
/// backfill of a missing `source` on legacy rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalObservation {
    /// Generated unique entry identifier.
    pub entry_id: EntryId,
    /// The observed animal.
    pub cow_id: String,
    /// Behavior category (e.g. `feeding`, `lying`).
    pub response_type: String,
    /// Ingestion source; `None` only for rows written before sources existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// When the behavior was observed.
    pub time: DateTime<Utc>,
}

/// A single environmental sensor reading, keyed by instrument and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorObservation {
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Reference ID of the instrument that produced the reading.
    pub instrument_id: u32,
    /// Reference ID of the measured metric.
    pub metric_id: u32,
    /// Reference ID of the unit of `value`.
    pub unit_id: u32,
    /// Reference ID of the optional meta cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_id: Option<u32>,
    /// Sampled medium (e.g. `water`, `air`).
    pub medium: String,
    /// Metric name, denormalized for display.
    pub metric_name: String,
    /// Measured value.
    pub value: Decimal,
    /// Standard error of the measurement, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<Decimal>,
}
