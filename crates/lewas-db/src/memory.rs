//! In-process store used for development and tests.
//!
//! Rows live in a [`BTreeMap`] keyed by primary key behind a tokio
//! [`RwLock`]. Range queries filter and sort on every call, which is fine
//! for the data volumes this backend is meant for.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::{ObservationStore, Page, RangeQuery, ScanRequest, TableRecord};

/// An [`ObservationStore`] held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore<R> {
    rows: RwLock<BTreeMap<String, R>>,
}

impl<R: TableRecord> MemoryStore<R> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<R: TableRecord> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: TableRecord> ObservationStore<R> for MemoryStore<R> {
    async fn put(&self, record: &R) -> Result<(), DbError> {
        self.rows
            .write()
            .await
            .insert(record.primary_key(), record.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<R>, DbError> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn query(&self, query: &RangeQuery) -> Result<Page<R>, DbError> {
        let rows = self.rows.read().await;

        let mut matching: Vec<&R> = rows
            .values()
            .filter(|r| r.partition().as_deref() == Some(query.partition.as_str()))
            .filter(|r| {
                let time = r.sort_time();
                time >= query.start && time <= query.end
            })
            .filter(|r| query.filters.iter().all(|f| f.matches(*r)))
            .filter(|r| {
                query
                    .exclusive_start
                    .as_ref()
                    .is_none_or(|start| r.cursor() < *start)
            })
            .collect();

        // Newest first; the primary key breaks ties so the order is total.
        matching.sort_by_cached_key(|r| std::cmp::Reverse(r.cursor()));

        let fetched = matching
            .into_iter()
            .take(query.limit.saturating_add(1))
            .cloned()
            .collect();

        Ok(Page::from_overfetch(fetched, query.limit))
    }

    async fn scan(&self, scan: &ScanRequest) -> Result<Page<R>, DbError> {
        let rows = self.rows.read().await;

        let fetched = rows
            .iter()
            .filter(|(key, _)| {
                scan.exclusive_start
                    .as_deref()
                    .is_none_or(|start| key.as_str() > start)
            })
            .map(|(_, r)| r)
            .filter(|r| scan.filters.iter().all(|f| f.matches(*r)))
            .take(scan.limit.saturating_add(1))
            .cloned()
            .collect();

        Ok(Page::from_overfetch(fetched, scan.limit))
    }

    async fn count(&self) -> Result<u64, DbError> {
        Ok(u64::try_from(self.rows.read().await.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use lewas_types::{AnimalObservation, EntryId, Source};

    use super::*;
    use crate::store::{Cursor, Filter};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn row(cow: &str, source: Option<Source>, minutes: i64) -> AnimalObservation {
        AnimalObservation {
            entry_id: EntryId::new(),
            cow_id: cow.to_owned(),
            response_type: String::from("feeding"),
            source,
            time: base_time() + Duration::minutes(minutes),
        }
    }

    fn range(partition: &str, limit: usize, start: Option<Cursor>) -> RangeQuery {
        RangeQuery {
            partition: partition.to_owned(),
            start: base_time(),
            end: base_time() + Duration::days(1),
            filters: Vec::new(),
            limit,
            exclusive_start: start,
        }
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemoryStore::<AnimalObservation>::new();
        let r = row("c-1", Some(Source::Manual), 5);
        assert!(store.put(&r).await.is_ok());
        let got = store.get(&r.entry_id.to_string()).await.ok().flatten();
        assert_eq!(got, Some(r));
        assert!(store.get("missing").await.ok().flatten().is_none());
    }

    #[tokio::test]
    async fn query_reads_one_partition_newest_first() {
        let store = MemoryStore::<AnimalObservation>::new();
        for minute in 0..5 {
            let _ = store.put(&row("c-1", Some(Source::Manual), minute)).await;
            let _ = store.put(&row("c-1", Some(Source::Sensor), minute)).await;
        }

        let page = store.query(&range("manual", 10, None)).await.unwrap_or_default();
        assert_eq!(page.items.len(), 5);
        assert!(page.last_evaluated.is_none());
        assert!(page.items.iter().all(|r| r.source == Some(Source::Manual)));
        assert!(page.items.windows(2).all(|w| match w {
            [a, b] => a.time >= b.time,
            _ => true,
        }));
    }

    #[tokio::test]
    async fn query_resumes_after_cursor_without_overlap() {
        let store = MemoryStore::<AnimalObservation>::new();
        for minute in 0..7 {
            let _ = store.put(&row("c-1", Some(Source::Manual), minute)).await;
        }

        let first = store.query(&range("manual", 4, None)).await.unwrap_or_default();
        assert_eq!(first.items.len(), 4);
        let cursor = first.last_evaluated.clone();
        assert!(cursor.is_some());

        let second = store.query(&range("manual", 4, cursor)).await.unwrap_or_default();
        assert_eq!(second.items.len(), 3);
        assert!(second.last_evaluated.is_none());
        assert!(
            second
                .items
                .iter()
                .all(|r| first.items.iter().all(|f| f.entry_id != r.entry_id))
        );
    }

    #[tokio::test]
    async fn filters_apply_before_limit() {
        let store = MemoryStore::<AnimalObservation>::new();
        for minute in 0..6 {
            let cow = if minute % 2 == 0 { "even" } else { "odd" };
            let _ = store.put(&row(cow, Some(Source::Manual), minute)).await;
        }

        let mut q = range("manual", 3, None);
        q.filters.push(Filter::eq("cow_id", "odd"));
        let page = store.query(&q).await.unwrap_or_default();
        assert_eq!(page.items.len(), 3);
        assert!(page.last_evaluated.is_none());
        assert!(page.items.iter().all(|r| r.cow_id == "odd"));
    }

    #[tokio::test]
    async fn scan_finds_missing_attribute_and_count_ignores_filters() {
        let store = MemoryStore::<AnimalObservation>::new();
        let _ = store.put(&row("c-1", None, 1)).await;
        let _ = store.put(&row("c-2", Some(Source::Sensor), 2)).await;
        let _ = store.put(&row("c-3", None, 3)).await;

        let page = store
            .scan(&ScanRequest {
                filters: vec![Filter::missing("source")],
                limit: 10,
                exclusive_start: None,
            })
            .await
            .unwrap_or_default();
        assert_eq!(page.items.len(), 2);
        assert_eq!(store.count().await.ok(), Some(3));
    }
}
