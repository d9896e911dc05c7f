use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::{ChangeEvent, ChangeKind, RawPosting, StructuredJob, UserProfile};
use crate::store::{
    image_of, ChangeFeed, ProfileSource, RecordStore, ScanFilter, SequencedChange, Table,
};

#[derive(Default)]
struct ChangeLog {
    entries: Vec<SequencedChange>,
    delivered: HashSet<i64>,
}

impl ChangeLog {
    fn append(&mut self, event: ChangeEvent) {
        let seq = self.entries.last().map(|c| c.seq).unwrap_or(0) + 1;
        self.entries.push(SequencedChange { seq, event });
    }
}

#[derive(Default)]
struct Inner {
    raw: HashMap<String, RawPosting>,
    structured: HashMap<String, StructuredJob>,
    profiles: HashMap<String, UserProfile>,
    raw_log: ChangeLog,
    structured_log: ChangeLog,
}

impl Inner {
    fn log_mut(&mut self, table: Table) -> &mut ChangeLog {
        match table {
            Table::RawPostings => &mut self.raw_log,
            Table::StructuredJobs => &mut self.structured_log,
        }
    }
}

/// In-process store with the same change-capture behaviour as `PgStore`.
/// A single mutex makes every write and its log append atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a profile. Profiles are not change-captured.
    pub async fn insert_profile(&self, profile: UserProfile) {
        let mut inner = self.inner.lock().await;
        inner.profiles.insert(profile.user_id.clone(), profile);
    }

    /// Every change ever captured for `table`, acknowledged or not.
    #[cfg(test)]
    pub async fn change_log(&self, table: Table) -> Vec<ChangeEvent> {
        let mut inner = self.inner.lock().await;
        inner
            .log_mut(table)
            .entries
            .iter()
            .map(|c| c.event.clone())
            .collect()
    }

    #[cfg(test)]
    pub async fn structured_count(&self) -> usize {
        self.inner.lock().await.structured.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put_raw(&self, posting: &RawPosting) -> Result<(), AppError> {
        let image = image_of(posting)?;
        let mut inner = self.inner.lock().await;
        let kind = match inner.raw.insert(posting.job_id.clone(), posting.clone()) {
            Some(_) => ChangeKind::Modify,
            None => ChangeKind::Insert,
        };
        inner
            .raw_log
            .append(ChangeEvent::new(kind, &posting.job_id, image));
        Ok(())
    }

    async fn get_raw(&self, job_id: &str) -> Result<Option<RawPosting>, AppError> {
        Ok(self.inner.lock().await.raw.get(job_id).cloned())
    }

    async fn put_structured(&self, job: &StructuredJob) -> Result<(), AppError> {
        let image = image_of(job)?;
        let mut inner = self.inner.lock().await;
        let kind = match inner.structured.insert(job.job_id.clone(), job.clone()) {
            Some(_) => ChangeKind::Modify,
            None => ChangeKind::Insert,
        };
        inner
            .structured_log
            .append(ChangeEvent::new(kind, &job.job_id, image));
        Ok(())
    }

    async fn update_fit_score(&self, job_id: &str, fit_score: f64) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        let job = inner
            .structured
            .get_mut(job_id)
            .ok_or_else(|| AppError::NotFound(format!("Structured job {job_id} not found")))?;
        job.fit_score = Some(fit_score);
        let image = image_of(job)?;
        inner
            .structured_log
            .append(ChangeEvent::new(ChangeKind::Modify, job_id, image));
        Ok(())
    }

    async fn get_structured(&self, job_id: &str) -> Result<Option<StructuredJob>, AppError> {
        Ok(self.inner.lock().await.structured.get(job_id).cloned())
    }

    async fn scan_structured(&self, filter: &ScanFilter) -> Result<Vec<StructuredJob>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .structured
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChangeFeed for MemoryStore {
    async fn poll(&self, table: Table, limit: usize) -> Result<Vec<SequencedChange>, AppError> {
        let mut inner = self.inner.lock().await;
        let log = inner.log_mut(table);
        Ok(log
            .entries
            .iter()
            .filter(|c| !log.delivered.contains(&c.seq))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ack(&self, table: Table, seqs: &[i64]) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        inner.log_mut(table).delivered.extend(seqs.iter().copied());
        Ok(())
    }
}

#[async_trait]
impl ProfileSource for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.inner.lock().await.profiles.get(user_id).cloned())
    }
}
