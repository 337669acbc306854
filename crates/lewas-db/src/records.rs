//! Table bindings for the stored observation records.

use chrono::{DateTime, SecondsFormat, Utc};
use lewas_types::{AnimalObservation, SensorObservation};

use crate::store::TableRecord;

impl TableRecord for AnimalObservation {
    const TABLE: &'static str = "animal_observations";
    const PARTITION_ATTRIBUTE: &'static str = "source";

    fn primary_key(&self) -> String {
        self.entry_id.to_string()
    }

    fn partition(&self) -> Option<String> {
        self.source.map(|s| s.as_str().to_owned())
    }

    fn sort_time(&self) -> DateTime<Utc> {
        self.time
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "entry_id" => Some(self.entry_id.to_string()),
            "cow_id" => Some(self.cow_id.clone()),
            "response_type" => Some(self.response_type.clone()),
            "source" => self.partition(),
            _ => None,
        }
    }
}

impl TableRecord for SensorObservation {
    const TABLE: &'static str = "sensor_observations";
    const PARTITION_ATTRIBUTE: &'static str = "instrument_id";

    /// `{instrument_id}#{timestamp}`: one reading per instrument per instant.
    fn primary_key(&self) -> String {
        format!(
            "{}#{}",
            self.instrument_id,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
        )
    }

    fn partition(&self) -> Option<String> {
        Some(self.instrument_id.to_string())
    }

    fn sort_time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "instrument_id" => Some(self.instrument_id.to_string()),
            "metric_id" => Some(self.metric_id.to_string()),
            "unit_id" => Some(self.unit_id.to_string()),
            "meta_id" => self.meta_id.map(|id| id.to_string()),
            "medium" => Some(self.medium.clone()),
            "metric_name" => Some(self.metric_name.clone()),
            _ => None,
        }
    }
}
