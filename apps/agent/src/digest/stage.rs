use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::digest::render::{render_digest, subject};
use crate::digest::sender::{DigestSender, SendOutcome};
use crate::errors::AppError;
use crate::models::StructuredJob;
use crate::store::{RecordStore, ScanFilter};

pub const MIN_DIGEST_SCORE: f64 = 70.0;
pub const DIGEST_WINDOW_HOURS: i64 = 24;
pub const DIGEST_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestResult {
    /// Every qualifying job, not just the ones rendered.
    pub match_count: usize,
    pub top_jobs: Vec<StructuredJob>,
    /// True only when the sender actually delivered the mail.
    pub sent: bool,
}

pub struct DigestStage {
    store: Arc<dyn RecordStore>,
    sender: Arc<dyn DigestSender>,
    recipient: String,
}

impl DigestStage {
    pub fn new(
        store: Arc<dyn RecordStore>,
        sender: Arc<dyn DigestSender>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sender,
            recipient: recipient.into(),
        }
    }

    /// Collects jobs scored >= 70 and analyzed within the 24 hours before `now`,
    /// and mails the top five. Nothing is sent when nothing qualifies.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<DigestResult, AppError> {
        let cutoff = now - Duration::hours(DIGEST_WINDOW_HOURS);
        info!(%cutoff, "Starting daily job digest");

        let mut jobs = self
            .store
            .scan_structured(&ScanFilter {
                min_fit_score: MIN_DIGEST_SCORE,
                analyzed_after: cutoff,
            })
            .await?;
        info!(count = jobs.len(), "Found jobs matching digest criteria");

        if jobs.is_empty() {
            info!("No high-fit jobs in the last 24 hours; skipping email");
            return Ok(DigestResult {
                match_count: 0,
                top_jobs: Vec::new(),
                sent: false,
            });
        }

        sort_by_score_desc(&mut jobs);
        let match_count = jobs.len();
        jobs.truncate(DIGEST_TOP_N);

        let html = render_digest(match_count, &jobs);
        let outcome = self
            .sender
            .send(&self.recipient, &subject(match_count), &html)
            .await?;
        let sent = outcome == SendOutcome::Delivered;

        info!(match_count, sent, "Digest run complete");
        Ok(DigestResult {
            match_count,
            top_jobs: jobs,
            sent,
        })
    }
}

/// Highest score first; ties go to the most recently analyzed, then by job id.
pub fn sort_by_score_desc(jobs: &mut [StructuredJob]) {
    jobs.sort_by(|a, b| {
        let (sa, sb) = (a.fit_score.unwrap_or(0.0), b.fit_score.unwrap_or(0.0));
        sb.partial_cmp(&sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.analyzed_at.cmp(&a.analyzed_at))
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
}
