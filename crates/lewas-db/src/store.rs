//! The key-value store abstraction every backend implements.
//!
//! A table holds records of one type. Each record has a primary key, an
//! optional partition label, and a sort time. The store offers exactly
//! the access paths the service needs:
//!
//! | Operation | Access path |
//! |-----------|-------------|
//! | [`ObservationStore::put`] | upsert by primary key |
//! | [`ObservationStore::get`] | point get by primary key |
//! | [`ObservationStore::query`] | one partition, time range, newest first |
//! | [`ObservationStore::scan`] | whole table, by primary key |
//! | [`ObservationStore::count`] | whole table, count only |
//!
//! Filters are applied after the index lookup and before the limit, so a
//! page never contains records that fail a filter, and a full page means
//! "possibly more", signalled by [`Page::last_evaluated`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// A record type that can be stored in an [`ObservationStore`].
pub trait TableRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Logical table name. Backends sharing one physical table key on it.
    const TABLE: &'static str;

    /// Name of the attribute that carries the partition label.
    const PARTITION_ATTRIBUTE: &'static str;

    /// Primary key, unique within the table.
    fn primary_key(&self) -> String;

    /// Partition label, or `None` when the record has not been assigned one.
    fn partition(&self) -> Option<String>;

    /// Sort key of the time index.
    fn sort_time(&self) -> DateTime<Utc>;

    /// String form of a named attribute, used for equality filters.
    ///
    /// Must agree with the attribute's JSON text so that backends that
    /// filter on the serialized body see the same value.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Position of this record in its partition's time index.
    fn cursor(&self) -> Cursor {
        Cursor {
            time: self.sort_time(),
            key: self.primary_key(),
        }
    }
}

/// A position in a table's index: the last record a query evaluated.
///
/// Ordered by `(time, key)`. Range queries walk the index from the
/// greatest position downwards; scans walk keys upwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Sort time of the last evaluated record.
    pub time: DateTime<Utc>,
    /// Primary key of the last evaluated record.
    pub key: String,
}

/// A post-index filter on a record attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// The attribute is present and equal to `value`.
    Eq {
        /// Attribute name.
        attribute: String,
        /// Required value.
        value: String,
    },
    /// The attribute is absent.
    Missing {
        /// Attribute name.
        attribute: String,
    },
}

impl Filter {
    /// Equality filter on `attribute`.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Filter matching records where `attribute` is absent.
    pub fn missing(attribute: impl Into<String>) -> Self {
        Self::Missing {
            attribute: attribute.into(),
        }
    }

    /// Whether `record` passes this filter.
    pub fn matches<R: TableRecord>(&self, record: &R) -> bool {
        match self {
            Self::Eq { attribute, value } => {
                record.attribute(attribute).as_deref() == Some(value.as_str())
            }
            Self::Missing { attribute } => record.attribute(attribute).is_none(),
        }
    }
}

/// A time-range query against one partition of the time index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Partition label to read.
    pub partition: String,
    /// Inclusive lower bound on the sort time.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound on the sort time.
    pub end: DateTime<Utc>,
    /// Post-index filters; all must match.
    pub filters: Vec<Filter>,
    /// Maximum number of records to return.
    pub limit: usize,
    /// Resume strictly below this position.
    pub exclusive_start: Option<Cursor>,
}

/// A full-table scan in primary key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Post-scan filters; all must match.
    pub filters: Vec<Filter>,
    /// Maximum number of records to return.
    pub limit: usize,
    /// Resume strictly after this primary key.
    pub exclusive_start: Option<String>,
}

/// One page of results from a query or scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    /// Records in index order.
    pub items: Vec<R>,
    /// Position of the last returned record when more matching records
    /// exist beyond it; `None` once the range is exhausted.
    pub last_evaluated: Option<Cursor>,
}

impl<R> Default for Page<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            last_evaluated: None,
        }
    }
}

impl<R: TableRecord> Page<R> {
    /// Build a page from up to `limit + 1` records in index order.
    ///
    /// The extra record, when present, proves there is more data; it is
    /// dropped and the page's last record becomes the resume position.
    pub fn from_overfetch(mut items: Vec<R>, limit: usize) -> Self {
        if items.len() > limit {
            items.truncate(limit);
            let last_evaluated = items.last().map(TableRecord::cursor);
            Self {
                items,
                last_evaluated,
            }
        } else {
            Self {
                items,
                last_evaluated: None,
            }
        }
    }
}

/// Storage backend for one record type.
#[async_trait]
pub trait ObservationStore<R: TableRecord>: Send + Sync {
    /// Insert or replace the record with the same primary key.
    async fn put(&self, record: &R) -> Result<(), DbError>;

    /// Fetch a record by primary key.
    async fn get(&self, key: &str) -> Result<Option<R>, DbError>;

    /// Read one partition's time range, newest first.
    async fn query(&self, query: &RangeQuery) -> Result<Page<R>, DbError>;

    /// Read the whole table in primary key order.
    async fn scan(&self, scan: &ScanRequest) -> Result<Page<R>, DbError>;

    /// Count every record in the table, ignoring partitions and filters.
    async fn count(&self) -> Result<u64, DbError>;
}
