//! Environmental sensor observations.
//!
//! Clients speak in reference names (instrument, unit, metric and medium,
//! meta cell); the store holds numeric reference IDs. This service
//! resolves names on the way in and names on the way out. Records are
//! partitioned by instrument ID.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use lewas_db::{Filter, ObservationStore, RangeQuery};
use lewas_types::SensorObservation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::merger::{ListPage, PageRequest, QueryMerger};
use crate::pagination::TimeRange;
use crate::reference::{Instrument, Metric, ReferenceData, Unit};
use crate::time::parse_instant;

/// Number of instruments reported by [`SensorService::latest`] by default.
pub const DEFAULT_LATEST_LIMIT: usize = 10;

/// What was sampled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Medium, e.g. `water`.
    pub medium: String,
    /// Metric name within the medium.
    pub metric: String,
    /// Optional meta cell name.
    #[serde(default)]
    pub meta: Option<String>,
}

/// A reading as submitted by an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSensorObservation {
    /// Reading time: RFC 3339, naive ISO (UTC) or time of day (today, UTC).
    pub timestamp: String,
    /// What was sampled.
    pub sample: Sample,
    /// Instrument name.
    pub instrument: String,
    /// Unit abbreviation.
    pub unit: String,
    /// Measured value.
    pub value: Decimal,
    /// Standard error, when reported.
    #[serde(default)]
    pub stderr: Option<Decimal>,
}

/// A stored reading with both names and reference IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorObservationView {
    /// Reading time.
    pub timestamp: DateTime<Utc>,
    /// What was sampled.
    pub sample: Sample,
    /// Instrument name.
    pub instrument: String,
    /// Unit abbreviation.
    pub unit: String,
    /// Measured value.
    pub value: Decimal,
    /// Standard error, when reported.
    pub stderr: Option<Decimal>,
    /// Instrument reference ID.
    pub instrument_id: u32,
    /// Metric reference ID.
    pub metric_id: u32,
    /// Unit reference ID.
    pub unit_id: u32,
    /// Meta cell reference ID.
    pub meta_id: Option<u32>,
    /// Medium.
    pub medium: String,
}

/// Name-based listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorFilter {
    /// Only this instrument (reads a single partition).
    pub instrument: Option<String>,
    /// Only this metric; requires `medium`.
    pub metric: Option<String>,
    /// Only this medium.
    pub medium: Option<String>,
    /// Only this unit.
    pub unit: Option<String>,
}

/// A batch item that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedObservation {
    /// The submitted reading.
    pub observation: NewSensorObservation,
    /// Why it failed.
    pub error: String,
}

/// Outcome of a batch submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorBatchSummary {
    /// Readings stored.
    pub successful: Vec<SensorObservationView>,
    /// Readings rejected or failed.
    pub failed: Vec<FailedObservation>,
}

/// The reference tables exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorMetadata {
    /// Known metrics.
    pub metrics: Vec<Metric>,
    /// Known instruments.
    pub instruments: Vec<Instrument>,
    /// Known units.
    pub units: Vec<Unit>,
}

/// Writes and reads sensor observations.
#[derive(Clone)]
pub struct SensorService {
    store: Arc<dyn ObservationStore<SensorObservation>>,
    reference: Arc<ReferenceData>,
}

impl SensorService {
    /// Serve from `store`, resolving names through `reference`.
    pub fn new(
        store: Arc<dyn ObservationStore<SensorObservation>>,
        reference: Arc<ReferenceData>,
    ) -> Self {
        Self { store, reference }
    }

    /// Resolve, store and echo one reading.
    pub async fn process(
        &self,
        new: NewSensorObservation,
        today: NaiveDate,
    ) -> Result<SensorObservationView, CoreError> {
        if new.sample.medium.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Sample must include a 'medium' field".to_owned(),
            ));
        }
        if new.sample.metric.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Sample must include a 'metric' field".to_owned(),
            ));
        }

        let timestamp = parse_instant(&new.timestamp, today)?;
        let instrument_id = self.resolve_instrument(&new.instrument)?;
        let unit_id = self.resolve_unit(&new.unit)?;
        let metric_id = self.resolve_metric(&new.sample.metric, &new.sample.medium)?;
        let meta_id = new
            .sample
            .meta
            .as_deref()
            .and_then(|name| self.reference.meta_id(name));

        let record = SensorObservation {
            timestamp,
            instrument_id,
            metric_id,
            unit_id,
            meta_id,
            medium: new.sample.medium.clone(),
            metric_name: new.sample.metric.clone(),
            value: new.value,
            stderr: new.stderr,
        };
        self.store.put(&record).await?;

        tracing::debug!(
            instrument_id,
            metric_id,
            timestamp = %timestamp,
            "Sensor observation stored"
        );

        Ok(SensorObservationView {
            timestamp,
            sample: new.sample,
            instrument: new.instrument,
            unit: new.unit,
            value: record.value,
            stderr: record.stderr,
            instrument_id,
            metric_id,
            unit_id,
            meta_id,
            medium: record.medium,
        })
    }

    /// Process every reading independently.
    pub async fn process_batch(
        &self,
        batch: Vec<NewSensorObservation>,
        today: NaiveDate,
    ) -> SensorBatchSummary {
        let mut summary = SensorBatchSummary::default();
        for new in batch {
            match self.process(new.clone(), today).await {
                Ok(view) => summary.successful.push(view),
                Err(e) => {
                    tracing::warn!(error = %e, instrument = %new.instrument, "Skipping sensor observation in batch");
                    summary.failed.push(FailedObservation {
                        observation: new,
                        error: e.to_string(),
                    });
                }
            }
        }
        summary
    }

    /// One page of readings, newest first.
    ///
    /// Reads only the named instrument's partition when `instrument` is
    /// set, otherwise merges every known instrument.
    pub async fn list(
        &self,
        filter: &SensorFilter,
        page: &PageRequest,
    ) -> Result<ListPage<SensorObservationView>, CoreError> {
        let partitions = match &filter.instrument {
            Some(name) => vec![self.resolve_instrument(name)?.to_string()],
            None => self.reference.instrument_labels(),
        };

        let mut filters = Vec::new();
        match (&filter.metric, &filter.medium) {
            (Some(_), None) => {
                return Err(CoreError::InvalidInput(
                    "Medium is required when filtering by metric".to_owned(),
                ));
            }
            (Some(metric), Some(medium)) => {
                let metric_id = self.resolve_metric(metric, medium)?;
                filters.push(Filter::eq("metric_id", metric_id.to_string()));
            }
            (None, Some(medium)) => filters.push(Filter::eq("medium", medium.as_str())),
            (None, None) => {}
        }
        if let Some(unit) = &filter.unit {
            filters.push(Filter::eq("unit_id", self.resolve_unit(unit)?.to_string()));
        }

        let page = QueryMerger::new(self.store.as_ref(), partitions)
            .fetch(&filters, page)
            .await?;
        Ok(page.map(|record| self.view(record)))
    }

    /// Newest reading of up to `limit` instruments, in reference order.
    ///
    /// Instruments that have never reported are skipped and do not count
    /// toward `limit`.
    pub async fn latest(&self, limit: usize) -> Result<Vec<SensorObservationView>, CoreError> {
        let range = TimeRange::unbounded();
        let queries: Vec<RangeQuery> = self
            .reference
            .instrument_labels()
            .into_iter()
            .map(|partition| RangeQuery {
                partition,
                start: range.start(),
                end: range.end(),
                filters: Vec::new(),
                limit: 1,
                exclusive_start: None,
            })
            .collect();

        let pages = try_join_all(queries.iter().map(|q| self.store.query(q))).await?;
        Ok(pages
            .into_iter()
            .filter_map(|page| page.items.into_iter().next())
            .take(limit)
            .map(|record| self.view(record))
            .collect())
    }

    /// Every reference table clients may choose names from.
    pub fn metadata(&self) -> SensorMetadata {
        SensorMetadata {
            metrics: self.reference.metrics().to_vec(),
            instruments: self.reference.instruments().to_vec(),
            units: self.reference.units().to_vec(),
        }
    }

    fn view(&self, record: SensorObservation) -> SensorObservationView {
        let meta = record
            .meta_id
            .and_then(|id| self.reference.meta_name(id))
            .map(str::to_owned);
        SensorObservationView {
            timestamp: record.timestamp,
            sample: Sample {
                medium: record.medium.clone(),
                metric: record.metric_name,
                meta,
            },
            instrument: self
                .reference
                .instrument_name(record.instrument_id)
                .unwrap_or_default()
                .to_owned(),
            unit: self
                .reference
                .unit_abbv(record.unit_id)
                .unwrap_or_default()
                .to_owned(),
            value: record.value,
            stderr: record.stderr,
            instrument_id: record.instrument_id,
            metric_id: record.metric_id,
            unit_id: record.unit_id,
            meta_id: record.meta_id,
            medium: record.medium,
        }
    }

    fn resolve_instrument(&self, name: &str) -> Result<u32, CoreError> {
        self.reference
            .instrument_id(name)
            .ok_or_else(|| CoreError::InvalidInput(format!("Unknown instrument: {name}")))
    }

    fn resolve_unit(&self, abbv: &str) -> Result<u32, CoreError> {
        self.reference
            .unit_id(abbv)
            .ok_or_else(|| CoreError::InvalidInput(format!("Unknown unit: {abbv}")))
    }

    fn resolve_metric(&self, metric: &str, medium: &str) -> Result<u32, CoreError> {
        self.reference.metric_id(metric, medium).ok_or_else(|| {
            CoreError::InvalidInput(format!("Unknown metric: {metric} with medium {medium}"))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use lewas_db::MemoryStore;

    use super::*;
    use crate::pagination::PageSize;
    use crate::reference::MetaCell;

    fn reference() -> Arc<ReferenceData> {
        Arc::new(ReferenceData::new(
            vec![
                Instrument {
                    instrument_id: 1,
                    name: "sonde".to_owned(),
                    description: None,
                },
                Instrument {
                    instrument_id: 2,
                    name: "weather".to_owned(),
                    description: None,
                },
                Instrument {
                    instrument_id: 3,
                    name: "idle".to_owned(),
                    description: None,
                },
            ],
            vec![
                Unit {
                    unit_id: 1,
                    abbv: "degC".to_owned(),
                    name: None,
                },
                Unit {
                    unit_id: 2,
                    abbv: "pH".to_owned(),
                    name: None,
                },
            ],
            vec![
                Metric {
                    metric_id: 10,
                    name: "temperature".to_owned(),
                    medium: "water".to_owned(),
                },
                Metric {
                    metric_id: 11,
                    name: "temperature".to_owned(),
                    medium: "air".to_owned(),
                },
                Metric {
                    metric_id: 12,
                    name: "ph".to_owned(),
                    medium: "water".to_owned(),
                },
            ],
            vec![MetaCell {
                meta_id: 4,
                name: "surface".to_owned(),
            }],
        ))
    }

    fn service() -> SensorService {
        SensorService::new(
            Arc::new(MemoryStore::<SensorObservation>::new()),
            reference(),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn reading(instrument: &str, metric: &str, medium: &str, at: &str) -> NewSensorObservation {
        NewSensorObservation {
            timestamp: at.to_owned(),
            sample: Sample {
                medium: medium.to_owned(),
                metric: metric.to_owned(),
                meta: None,
            },
            instrument: instrument.to_owned(),
            unit: "degC".to_owned(),
            value: Decimal::new(215, 1),
            stderr: None,
        }
    }

    fn everything() -> PageRequest {
        PageRequest {
            range: TimeRange::unbounded(),
            page_size: PageSize::new(Some(100)).unwrap(),
            token: None,
            include_total: false,
        }
    }

    #[tokio::test]
    async fn process_resolves_reference_ids() {
        let service = service();
        let mut new = reading("sonde", "temperature", "water", "2025-06-01T10:00:00Z");
        new.sample.meta = Some("surface".to_owned());

        let view = service.process(new, today()).await.unwrap();
        assert_eq!(view.instrument_id, 1);
        assert_eq!(view.metric_id, 10);
        assert_eq!(view.unit_id, 1);
        assert_eq!(view.meta_id, Some(4));
        assert_eq!(view.medium, "water");
    }

    #[tokio::test]
    async fn time_of_day_is_today() {
        let view = service()
            .process(reading("sonde", "temperature", "water", "08:30:00"), today())
            .await
            .unwrap();
        assert_eq!(
            Some(view.timestamp),
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).single()
        );
    }

    #[tokio::test]
    async fn unknown_names_are_invalid_input() {
        let service = service();
        for new in [
            reading("drone", "temperature", "water", "2025-06-01T10:00:00Z"),
            reading("sonde", "turbidity", "water", "2025-06-01T10:00:00Z"),
            reading("sonde", "temperature", "soil", "2025-06-01T10:00:00Z"),
            reading("sonde", "", "water", "2025-06-01T10:00:00Z"),
        ] {
            let result = service.process(new, today()).await;
            assert!(matches!(result, Err(CoreError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn batch_reports_failed_items() {
        let summary = service()
            .process_batch(
                vec![
                    reading("sonde", "temperature", "water", "2025-06-01T10:00:00Z"),
                    reading("drone", "temperature", "water", "2025-06-01T10:00:00Z"),
                ],
                today(),
            )
            .await;
        assert_eq!(summary.successful.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed.iter().all(|f| f.error.contains("drone")));
    }

    #[tokio::test]
    async fn list_merges_instruments_and_filters() {
        let service = service();
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        for i in 0..5 {
            let at = (start + Duration::minutes(i)).to_rfc3339();
            let _ = service.process(reading("sonde", "temperature", "water", &at), today()).await;
            let _ = service.process(reading("weather", "temperature", "air", &at), today()).await;
        }

        let all = service.list(&SensorFilter::default(), &everything()).await.unwrap();
        assert_eq!(all.items.len(), 10);
        assert!(all.items.windows(2).all(|w| match w {
            [a, b] => a.timestamp >= b.timestamp,
            _ => true,
        }));

        let air = SensorFilter {
            metric: Some("temperature".to_owned()),
            medium: Some("air".to_owned()),
            ..SensorFilter::default()
        };
        let page = service.list(&air, &everything()).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(page.items.iter().all(|v| v.instrument == "weather"));

        let sonde = SensorFilter {
            instrument: Some("sonde".to_owned()),
            ..SensorFilter::default()
        };
        let page = service.list(&sonde, &everything()).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(page.items.iter().all(|v| v.instrument_id == 1 && v.unit == "degC"));
    }

    #[tokio::test]
    async fn metric_without_medium_is_rejected() {
        let filter = SensorFilter {
            metric: Some("temperature".to_owned()),
            ..SensorFilter::default()
        };
        let result = service().list(&filter, &everything()).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(m)) if m.contains("Medium")));
    }

    #[tokio::test]
    async fn latest_returns_newest_per_reporting_instrument() {
        let service = service();
        for at in ["2025-06-01T10:00:00Z", "2025-06-01T11:00:00Z"] {
            let _ = service.process(reading("sonde", "temperature", "water", at), today()).await;
        }
        let _ = service
            .process(reading("weather", "temperature", "air", "2025-06-01T09:00:00Z"), today())
            .await;

        let latest = service.latest(DEFAULT_LATEST_LIMIT).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(
            latest.first().map(|v| v.timestamp),
            Utc.with_ymd_and_hms(2025, 6, 1, 11, 0, 0).single()
        );

        assert_eq!(service.latest(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_limit_skips_silent_instruments() {
        let service = service();
        let _ = service
            .process(reading("weather", "temperature", "air", "2025-06-01T09:00:00Z"), today())
            .await;

        let latest = service.latest(1).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest.first().map(|v| v.instrument.as_str()), Some("weather"));
    }

    #[test]
    fn metadata_lists_reference_tables() {
        let metadata = service().metadata();
        assert_eq!(metadata.instruments.len(), 3);
        assert_eq!(metadata.metrics.len(), 3);
        assert_eq!(metadata.units.len(), 2);
    }
}
