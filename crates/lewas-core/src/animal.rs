//! Animal-behavior observations.
//!
//! Records are partitioned by ingestion [`Source`], so every listing is a
//! merge over the `manual` and `sensor` partitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lewas_db::{Filter, ObservationStore, ScanRequest};
use lewas_types::{AnimalObservation, EntryId, Source};

use crate::error::CoreError;
use crate::merger::{ListPage, PageRequest, QueryMerger};

/// Records rewritten per scan batch during a source backfill.
const BACKFILL_BATCH: usize = 100;

/// A new observation as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnimalObservation {
    /// The observed animal.
    pub cow_id: String,
    /// Behavior category.
    pub response_type: String,
    /// Observation time; now when absent.
    pub time: Option<DateTime<Utc>>,
    /// Ingestion source; `manual` when absent.
    pub source: Option<Source>,
}

/// Optional equality filters for listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimalFilter {
    /// Only this animal.
    pub cow_id: Option<String>,
    /// Only this behavior category.
    pub response_type: Option<String>,
}

impl AnimalFilter {
    fn to_filters(&self) -> Vec<Filter> {
        let mut filters = Vec::with_capacity(2);
        if let Some(cow_id) = &self.cow_id {
            filters.push(Filter::eq("cow_id", cow_id.as_str()));
        }
        if let Some(response_type) = &self.response_type {
            filters.push(Filter::eq("response_type", response_type.as_str()));
        }
        filters
    }
}

/// Outcome of a batch insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// IDs of the records written, in submission order.
    pub entry_ids: Vec<EntryId>,
    /// Number of records written.
    pub successful: usize,
    /// Number of records rejected or failed.
    pub failed: usize,
}

/// Writes and reads animal observations.
#[derive(Clone)]
pub struct AnimalService {
    store: Arc<dyn ObservationStore<AnimalObservation>>,
}

impl AnimalService {
    /// Serve from `store`.
    pub fn new(store: Arc<dyn ObservationStore<AnimalObservation>>) -> Self {
        Self { store }
    }

    /// Partition labels, in scan order.
    pub fn partitions() -> Vec<String> {
        Source::ALL.iter().map(|s| s.as_str().to_owned()).collect()
    }

    /// Validate and store one observation.
    pub async fn create(
        &self,
        new: NewAnimalObservation,
        now: DateTime<Utc>,
    ) -> Result<AnimalObservation, CoreError> {
        if new.cow_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("cow_id must not be empty".to_owned()));
        }
        if new.response_type.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "response_type must not be empty".to_owned(),
            ));
        }

        let record = AnimalObservation {
            entry_id: EntryId::new(),
            cow_id: new.cow_id,
            response_type: new.response_type,
            source: Some(new.source.unwrap_or_default()),
            time: new.time.unwrap_or(now),
        };
        self.store.put(&record).await?;

        tracing::debug!(
            entry_id = %record.entry_id,
            cow_id = %record.cow_id,
            "Animal observation stored"
        );
        Ok(record)
    }

    /// Store every observation that passes validation.
    ///
    /// Individual failures are counted and logged; they never fail the
    /// batch.
    pub async fn create_batch(
        &self,
        batch: Vec<NewAnimalObservation>,
        now: DateTime<Utc>,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for new in batch {
            match self.create(new, now).await {
                Ok(record) => {
                    summary.entry_ids.push(record.entry_id);
                    summary.successful = summary.successful.saturating_add(1);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping animal observation in batch");
                    summary.failed = summary.failed.saturating_add(1);
                }
            }
        }
        summary
    }

    /// Look up one observation.
    pub async fn get(&self, entry_id: EntryId) -> Result<AnimalObservation, CoreError> {
        self.store
            .get(&entry_id.to_string())
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("entry {entry_id}")))
    }

    /// One page of observations across every source, newest first.
    pub async fn list(
        &self,
        filter: &AnimalFilter,
        page: &PageRequest,
    ) -> Result<ListPage<AnimalObservation>, CoreError> {
        QueryMerger::new(self.store.as_ref(), Self::partitions())
            .fetch(&filter.to_filters(), page)
            .await
    }

    /// Assign `source` to every record stored without one.
    ///
    /// Returns the number of records rewritten. Safe to re-run: records
    /// that already carry a source are never touched.
    pub async fn backfill_source(&self, source: Source) -> Result<u64, CoreError> {
        let mut request = ScanRequest {
            filters: vec![Filter::missing("source")],
            limit: BACKFILL_BATCH,
            exclusive_start: None,
        };
        let mut updated: u64 = 0;

        loop {
            let page = self.store.scan(&request).await?;
            for mut record in page.items {
                record.source = Some(source);
                self.store.put(&record).await?;
                updated = updated.saturating_add(1);
            }

            match page.last_evaluated {
                Some(cursor) => request.exclusive_start = Some(cursor.key),
                None => break,
            }
        }

        tracing::info!(source = %source, updated, "Source backfill complete");
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lewas_db::MemoryStore;

    use super::*;
    use crate::pagination::{PageSize, TimeRange};

    fn service() -> (Arc<MemoryStore<AnimalObservation>>, AnimalService) {
        let store = Arc::new(MemoryStore::<AnimalObservation>::new());
        (Arc::clone(&store), AnimalService::new(store))
    }

    fn new(cow_id: &str, response_type: &str) -> NewAnimalObservation {
        NewAnimalObservation {
            cow_id: cow_id.to_owned(),
            response_type: response_type.to_owned(),
            time: None,
            source: None,
        }
    }

    fn everything() -> PageRequest {
        PageRequest {
            range: TimeRange::unbounded(),
            page_size: PageSize::new(Some(1000)).unwrap_or_default(),
            token: None,
            include_total: true,
        }
    }

    #[tokio::test]
    async fn create_fills_defaults_and_get_returns_it() {
        let (_, service) = service();
        let now = Utc::now();

        let created = service.create(new("c-1", "feeding"), now).await.unwrap();
        assert_eq!(created.source, Some(Source::Manual));
        assert_eq!(created.time, now);

        let fetched = service.get(created.entry_id).await.ok();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn blank_fields_are_invalid() {
        let (_, service) = service();
        let result = service.create(new("  ", "feeding"), Utc::now()).await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let (_, service) = service();
        let result = service.get(EntryId::new()).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn batch_counts_failures_without_aborting() {
        let (_, service) = service();
        let summary = service
            .create_batch(
                vec![new("c-1", "feeding"), new("", "feeding"), new("c-2", "lying")],
                Utc::now(),
            )
            .await;
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.entry_ids.len(), 2);
    }

    #[tokio::test]
    async fn list_merges_sources_and_applies_filters() {
        let (_, service) = service();
        let now = Utc::now();
        let mut sensor = new("c-1", "feeding");
        sensor.source = Some(Source::Sensor);
        let _ = service.create(sensor, now).await;
        let _ = service.create(new("c-1", "lying"), now).await;
        let _ = service.create(new("c-2", "feeding"), now).await;

        let filter = AnimalFilter {
            cow_id: Some("c-1".to_owned()),
            response_type: None,
        };
        let page = service.list(&filter, &everything()).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|r| r.cow_id == "c-1"));
        assert_eq!(page.total, Some(3));
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn backfill_touches_only_unsourced_records() {
        let (store, service) = service();
        let legacy: Vec<AnimalObservation> = (0..250)
            .map(|_| AnimalObservation {
                entry_id: EntryId::new(),
                cow_id: "c-9".to_owned(),
                response_type: "feeding".to_owned(),
                source: None,
                time: Utc::now(),
            })
            .collect();
        for record in &legacy {
            let _ = store.put(record).await;
        }
        let mut sensor = new("c-1", "feeding");
        sensor.source = Some(Source::Sensor);
        let _ = service.create(sensor, Utc::now()).await;

        let updated = service.backfill_source(Source::Manual).await.ok();
        assert_eq!(updated, Some(250));

        let page = service
            .list(&AnimalFilter::default(), &everything())
            .await
            .unwrap();
        let manual = page
            .items
            .iter()
            .filter(|r| r.source == Some(Source::Manual))
            .count();
        assert_eq!(manual, 250);
        assert_eq!(page.items.len(), 251);

        assert_eq!(service.backfill_source(Source::Manual).await.ok(), Some(0));
    }
}
