//! Extraction Stage: raw posting Insert events → structured records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extraction::extractor::Extractor;
use crate::models::{ChangeEvent, ChangeKind, RawPosting, StructuredJob};
use crate::pipeline::BatchReport;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Stored,
    /// The extractor found no usable structure. Logged; nothing written.
    Dropped,
}

pub struct ExtractionStage {
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn RecordStore>,
}

impl ExtractionStage {
    pub fn new(extractor: Arc<dyn Extractor>, store: Arc<dyn RecordStore>) -> Self {
        Self { extractor, store }
    }

    pub async fn on_insert(&self, raw: &RawPosting) -> Result<ExtractionOutcome, AppError> {
        self.on_insert_at(raw, Utc::now()).await
    }

    /// Extracts `raw` and overwrites its structured record, stamped with `analyzed_at`.
    /// `job_id` is copied verbatim from the posting; nothing else writes it.
    pub async fn on_insert_at(
        &self,
        raw: &RawPosting,
        analyzed_at: DateTime<Utc>,
    ) -> Result<ExtractionOutcome, AppError> {
        info!(job_id = %raw.job_id, "Analyzing job");

        let Some(fields) = self.extractor.extract(&raw.raw_description).await? else {
            warn!(job_id = %raw.job_id, "Failed to extract structured data; dropping event");
            return Ok(ExtractionOutcome::Dropped);
        };

        let job = StructuredJob::from_extraction(raw.job_id.clone(), fields, analyzed_at);
        self.store.put_structured(&job).await?;

        info!(job_id = %raw.job_id, "Stored structured job");
        Ok(ExtractionOutcome::Stored)
    }

    /// Processes a delivery batch in order. Only Insert events are handled.
    /// Transport errors abort the batch so the delivery side can redeliver it.
    pub async fn handle_batch(&self, events: &[ChangeEvent]) -> Result<BatchReport, AppError> {
        let mut report = BatchReport::new(events.len());

        for event in events {
            if event.event_kind != ChangeKind::Insert {
                report.ignored += 1;
                continue;
            }

            let raw = match decode_posting(event) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(key = %event.key, "Skipping raw posting event: {e}");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.on_insert(&raw).await? {
                ExtractionOutcome::Stored => report.processed += 1,
                ExtractionOutcome::Dropped => report.skipped += 1,
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            ignored = report.ignored,
            "Extraction batch complete"
        );
        Ok(report)
    }
}

fn decode_posting(event: &ChangeEvent) -> Result<RawPosting, AppError> {
    let image = event
        .new_image
        .clone()
        .ok_or_else(|| AppError::MalformedRecord("Insert event has no image".to_string()))?;
    serde_json::from_value(image)
        .map_err(|e| AppError::MalformedRecord(format!("Raw posting image does not decode: {e}")))
}
