//! Validated listing parameters and the continuation token codec.
//!
//! A continuation token maps partition labels to resume positions. On the
//! wire it is URL-safe base64 (no padding) of the JSON object, e.g.
//!
//! ```text
//! {"manual": {"time": "2025-06-01T10:00:00Z", "key": "0190..."}, "sensor": null}
//! ```
//!
//! Inside a token, `null` resumes that partition from the start of the
//! range and a missing label means the partition is exhausted. A request
//! without a token (or with an empty one) starts every partition.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use lewas_db::Cursor;

use crate::error::CoreError;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Largest page a caller can ask for; larger requests are clamped.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Unix seconds of `2000-01-01T00:00:00Z`, the default start of every
/// listing range.
const DEFAULT_START_SECS: i64 = 946_684_800;

/// Unix seconds of `9999-12-31T23:59:59Z`.
const FAR_FUTURE_SECS: i64 = 253_402_300_799;

/// Default start of a listing range: `2000-01-01T00:00:00Z`.
pub fn default_start() -> DateTime<Utc> {
    DateTime::from_timestamp(DEFAULT_START_SECS, 0).unwrap_or_default()
}

/// A positive, bounded number of records per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageSize(usize);

impl PageSize {
    /// Validate a caller-supplied page size.
    ///
    /// `None` gives [`DEFAULT_PAGE_SIZE`]; zero and negative values are
    /// rejected; values above [`MAX_PAGE_SIZE`] are clamped.
    pub fn new(requested: Option<i64>) -> Result<Self, CoreError> {
        let Some(requested) = requested else {
            return Ok(Self(DEFAULT_PAGE_SIZE));
        };
        if requested <= 0 {
            return Err(CoreError::InvalidInput(format!(
                "limit must be a positive integer, got {requested}"
            )));
        }
        let size = usize::try_from(requested).unwrap_or(MAX_PAGE_SIZE);
        Ok(Self(size.min(MAX_PAGE_SIZE)))
    }

    /// The page size as a count.
    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(DEFAULT_PAGE_SIZE)
    }
}

/// An inclusive time range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, filling in defaults.
    ///
    /// A missing `end` is `now`; a missing `start` is [`default_start`].
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let end = end.unwrap_or(now);
        let start = start.unwrap_or_else(default_start);
        if start > end {
            return Err(CoreError::InvalidInput(format!(
                "start_time {start} is after end_time {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// A range covering every plausible observation time.
    pub fn unbounded() -> Self {
        Self {
            start: DateTime::<Utc>::default(),
            end: DateTime::from_timestamp(FAR_FUTURE_SECS, 0).unwrap_or_default(),
        }
    }

    /// Inclusive lower bound.
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Inclusive upper bound.
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `instant` lies inside the range.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Per-partition resume positions carried between listing calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinuationToken {
    resume: BTreeMap<String, Option<Cursor>>,
}

impl ContinuationToken {
    /// An empty token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume `partition` after `cursor`, or from the start when `None`.
    pub fn insert(&mut self, partition: impl Into<String>, cursor: Option<Cursor>) {
        self.resume.insert(partition.into(), cursor);
    }

    /// Whether no partition has anything left to read.
    pub fn is_empty(&self) -> bool {
        self.resume.is_empty()
    }

    /// Resume position of `partition`.
    ///
    /// `None` means the partition is exhausted; `Some(None)` means it
    /// starts from the beginning of the range.
    pub fn position(&self, partition: &str) -> Option<Option<&Cursor>> {
        self.resume.get(partition).map(Option::as_ref)
    }

    /// Partition labels still carried by the token.
    pub fn partitions(&self) -> impl Iterator<Item = &str> {
        self.resume.keys().map(String::as_str)
    }

    /// Serialize for transport.
    pub fn encode(&self) -> Result<String, CoreError> {
        let json = serde_json::to_vec(&self.resume)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode a token received from a caller.
    ///
    /// Every label must be one of `known` partitions. Any failure is
    /// reported as [`CoreError::InvalidToken`].
    pub fn decode(encoded: &str, known: &[String]) -> Result<Self, CoreError> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded.trim()).map_err(|e| {
            tracing::debug!(error = %e, "Pagination token is not base64");
            CoreError::InvalidToken
        })?;

        let resume: BTreeMap<String, Option<Cursor>> =
            serde_json::from_slice(&bytes).map_err(|e| {
                tracing::debug!(error = %e, "Pagination token is not a partition map");
                CoreError::InvalidToken
            })?;

        if let Some(unknown) = resume.keys().find(|label| !known.contains(*label)) {
            tracing::debug!(partition = %unknown, "Pagination token names an unknown partition");
            return Err(CoreError::InvalidToken);
        }

        Ok(Self { resume })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn labels() -> Vec<String> {
        vec![String::from("manual"), String::from("sensor")]
    }

    #[test]
    fn page_size_defaults_and_bounds() {
        assert_eq!(PageSize::new(None).map(PageSize::get).ok(), Some(100));
        assert_eq!(PageSize::new(Some(7)).map(PageSize::get).ok(), Some(7));
        assert_eq!(PageSize::new(Some(50_000)).map(PageSize::get).ok(), Some(MAX_PAGE_SIZE));
        assert!(matches!(PageSize::new(Some(0)), Err(CoreError::InvalidInput(_))));
        assert!(matches!(PageSize::new(Some(-5)), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn time_range_defaults_to_fixed_floor_and_now() {
        let now = Utc::now();
        let range = TimeRange::new(None, None, now).ok();
        assert_eq!(range.map(|r| r.end()), Some(now));
        assert_eq!(
            range.map(|r| r.start()),
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).single()
        );
    }

    #[test]
    fn inverted_time_range_is_rejected() {
        let now = Utc::now();
        let later = now + chrono::Duration::hours(1);
        assert!(matches!(
            TimeRange::new(Some(later), Some(now), now),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn token_survives_transport() {
        let mut token = ContinuationToken::new();
        token.insert(
            "manual",
            Some(Cursor {
                time: Utc::now(),
                key: String::from("abc"),
            }),
        );
        token.insert("sensor", None);

        let encoded = token.encode().unwrap_or_default();
        assert!(!encoded.contains('+') && !encoded.contains('/') && !encoded.contains('='));

        let decoded = ContinuationToken::decode(&encoded, &labels()).ok();
        assert_eq!(decoded.as_ref(), Some(&token));
        assert_eq!(decoded.as_ref().and_then(|t| t.position("sensor")), Some(None));
        assert!(decoded.as_ref().is_some_and(|t| t.position("other").is_none()));
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        assert!(matches!(
            ContinuationToken::decode("%%%not-base64%%%", &labels()),
            Err(CoreError::InvalidToken)
        ));

        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(matches!(
            ContinuationToken::decode(&not_json, &labels()),
            Err(CoreError::InvalidToken)
        ));

        let unknown = URL_SAFE_NO_PAD.encode(br#"{"drone": null}"#);
        assert!(matches!(
            ContinuationToken::decode(&unknown, &labels()),
            Err(CoreError::InvalidToken)
        ));
    }
}
