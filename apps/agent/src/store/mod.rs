//! Record store seams: the persistent, change-capturing key-value store every stage
//! reads and writes through.
//!
//! Two implementations: `PgStore` (Postgres, change log written in the same transaction
//! as the record) and `MemoryStore` (tests and `STORE_BACKEND=memory`).
//!
//! Every write appends a `ChangeEvent` to the table's ordered log: `Insert` when the key
//! was absent, `Modify` otherwise, with the full record after the write as `new_image`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{ChangeEvent, RawPosting, StructuredJob, UserProfile};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The two change-captured tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    RawPostings,
    StructuredJobs,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::RawPostings => "raw_postings",
            Table::StructuredJobs => "structured_jobs",
        }
    }
}

/// Predicate for `scan_structured`. Both bounds apply; a missing score counts as 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanFilter {
    /// Inclusive.
    pub min_fit_score: f64,
    /// Exclusive.
    pub analyzed_after: DateTime<Utc>,
}

impl ScanFilter {
    pub fn matches(&self, job: &StructuredJob) -> bool {
        job.fit_score.unwrap_or(0.0) >= self.min_fit_score && job.analyzed_at > self.analyzed_after
    }
}

/// A change event plus its position in the table's log.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedChange {
    pub seq: i64,
    pub event: ChangeEvent,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert-or-replace a raw posting.
    async fn put_raw(&self, posting: &RawPosting) -> Result<(), AppError>;

    async fn get_raw(&self, job_id: &str) -> Result<Option<RawPosting>, AppError>;

    /// Insert-or-replace a structured record. A second put for the same key overwrites.
    async fn put_structured(&self, job: &StructuredJob) -> Result<(), AppError>;

    /// In-place update of `fit_score` only. Errors with `NotFound` if the record is gone.
    async fn update_fit_score(&self, job_id: &str, fit_score: f64) -> Result<(), AppError>;

    async fn get_structured(&self, job_id: &str) -> Result<Option<StructuredJob>, AppError>;

    async fn scan_structured(&self, filter: &ScanFilter) -> Result<Vec<StructuredJob>, AppError>;
}

/// Ordered delivery of captured changes, per table.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Up to `limit` unacknowledged changes in log order.
    async fn poll(&self, table: Table, limit: usize) -> Result<Vec<SequencedChange>, AppError>;

    /// Marks exactly the given changes as delivered. Sequence numbers are assigned
    /// before commit, so a lower seq may become visible after a higher one was polled;
    /// acking by range would drop it.
    async fn ack(&self, table: Table, seqs: &[i64]) -> Result<(), AppError>;
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;
}

/// JSON image of a record as it appears in change events.
pub(crate) fn image_of<T: serde::Serialize>(record: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize record image: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StructuredFields;
    use chrono::Duration;

    #[test]
    fn test_scan_filter_score_inclusive_time_exclusive() {
        let cutoff = Utc::now();
        let mut job = StructuredJob::from_extraction(
            "j",
            StructuredFields::default(),
            cutoff + Duration::seconds(1),
        );
        job.fit_score = Some(70.0);
        let filter = ScanFilter {
            min_fit_score: 70.0,
            analyzed_after: cutoff,
        };
        assert!(filter.matches(&job));

        job.analyzed_at = cutoff;
        assert!(!filter.matches(&job));
    }

    #[test]
    fn test_scan_filter_treats_missing_score_as_zero() {
        let now = Utc::now();
        let mut job = StructuredJob::from_extraction("j", StructuredFields::default(), now);
        job.fit_score = None;
        let filter = ScanFilter {
            min_fit_score: 0.0,
            analyzed_after: now - Duration::hours(1),
        };
        assert!(filter.matches(&job));
    }
}
