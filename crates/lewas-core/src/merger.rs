//! Paginated multi-partition query merger.
//!
//! The store indexes records by partition label and time. A listing that
//! spans every partition therefore fans out one range query per partition,
//! merges the results newest first, truncates to the page size, and hands
//! back a [`ContinuationToken`] with one resume position per partition.
//!
//! # Resume positions
//!
//! A partition may return records that lose the merge and are cut from the
//! page. Its resume position is the last record it actually contributed,
//! not the last record the store evaluated, so the cut records come back
//! on the next page:
//!
//! | Partition outcome | Entry in the next token |
//! |-------------------|-------------------------|
//! | some fetched records cut | last contributed record (or previous position if none) |
//! | all kept, store reports more | store's last evaluated position |
//! | all kept, store reports end | omitted (exhausted) |
//!
//! No partition left means no token: the listing is complete.
//!
//! The partition queries and the optional total count are independent
//! reads with no snapshot isolation between them; a count taken alongside
//! a page can disagree with it under concurrent writes.

use futures::future::try_join_all;
use lewas_db::{Cursor, Filter, ObservationStore, RangeQuery, TableRecord};

use crate::error::CoreError;
use crate::pagination::{ContinuationToken, PageSize, TimeRange};

/// Paging parameters shared by every listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Inclusive time window.
    pub range: TimeRange,
    /// Maximum number of records to return.
    pub page_size: PageSize,
    /// Encoded continuation token from a previous page.
    pub token: Option<String>,
    /// Also count every record in the table.
    pub include_total: bool,
}

/// One page of a merged listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<R> {
    /// Records ordered newest first.
    pub items: Vec<R>,
    /// Encoded token for the next page, absent once every partition is
    /// exhausted.
    pub next_token: Option<String>,
    /// Unfiltered record count of the whole table, when requested.
    pub total: Option<u64>,
}

impl<R> ListPage<R> {
    /// Transform every record, keeping the pagination metadata.
    pub fn map<T>(self, f: impl FnMut(R) -> T) -> ListPage<T> {
        ListPage {
            items: self.items.into_iter().map(f).collect(),
            next_token: self.next_token,
            total: self.total,
        }
    }
}

/// Fans a listing out over a fixed set of partitions of one store.
pub struct QueryMerger<'a, R: TableRecord> {
    store: &'a dyn ObservationStore<R>,
    partitions: Vec<String>,
}

impl<'a, R: TableRecord> QueryMerger<'a, R> {
    /// Merge over `partitions`, in scan order.
    pub const fn new(store: &'a dyn ObservationStore<R>, partitions: Vec<String>) -> Self {
        Self { store, partitions }
    }

    /// Fetch one page of records matching `filters`.
    ///
    /// Fails as a whole if the token is malformed or any partition query
    /// fails; a partially merged page is never returned.
    pub async fn fetch(
        &self,
        filters: &[Filter],
        request: &PageRequest,
    ) -> Result<ListPage<R>, CoreError> {
        let page_size = request.page_size.get();
        let plan = self.plan(request.token.as_deref())?;

        let queries: Vec<RangeQuery> = plan
            .iter()
            .map(|(partition, resume)| RangeQuery {
                partition: (*partition).to_owned(),
                start: request.range.start(),
                end: request.range.end(),
                filters: filters.to_vec(),
                limit: page_size,
                exclusive_start: resume.clone(),
            })
            .collect();

        let pages = try_join_all(queries.iter().map(|q| self.store.query(q))).await?;

        let mut outcomes = Vec::with_capacity(pages.len());
        let mut merged: Vec<(usize, R)> = Vec::new();
        for (slot, page) in pages.into_iter().enumerate() {
            outcomes.push((page.items.len(), page.last_evaluated));
            merged.extend(page.items.into_iter().map(|record| (slot, record)));
        }

        // Stable: ties keep partition scan order, then in-partition order.
        merged.sort_by(|(_, a), (_, b)| b.sort_time().cmp(&a.sort_time()));
        merged.truncate(page_size);

        let mut kept: Vec<(usize, Option<Cursor>)> = vec![(0, None); plan.len()];
        for (slot, record) in &merged {
            if let Some(entry) = kept.get_mut(*slot) {
                entry.0 = entry.0.saturating_add(1);
                entry.1 = Some(record.cursor());
            }
        }

        let mut next = ContinuationToken::new();
        for (((partition, previous), (fetched, last_evaluated)), (kept_count, last_kept)) in
            plan.into_iter().zip(outcomes).zip(kept)
        {
            if kept_count < fetched {
                next.insert(partition, last_kept.or(previous));
            } else if last_evaluated.is_some() {
                next.insert(partition, last_evaluated);
            }
        }

        let next_token = if next.is_empty() {
            None
        } else {
            Some(next.encode()?)
        };

        let total = if request.include_total {
            Some(self.store.count().await?)
        } else {
            None
        };

        let items: Vec<R> = merged.into_iter().map(|(_, record)| record).collect();

        tracing::debug!(
            table = R::TABLE,
            returned = items.len(),
            has_more = next_token.is_some(),
            "Merged partition page"
        );

        Ok(ListPage {
            items,
            next_token,
            total,
        })
    }

    /// Partitions to read and where each resumes.
    fn plan(&self, token: Option<&str>) -> Result<Vec<(&str, Option<Cursor>)>, CoreError> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .map(|t| ContinuationToken::decode(t, &self.partitions))
            .transpose()?
            .filter(|t| !t.is_empty());

        let Some(token) = token else {
            return Ok(self.partitions.iter().map(|p| (p.as_str(), None)).collect());
        };
        tracing::debug!(
            partitions = ?token.partitions().collect::<Vec<_>>(),
            "Resuming from continuation token"
        );

        Ok(self
            .partitions
            .iter()
            .filter_map(|p| {
                token
                    .position(p)
                    .map(|resume| (p.as_str(), resume.cloned()))
            })
            .collect())
    }
}
