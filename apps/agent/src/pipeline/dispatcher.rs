use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::extraction::ExtractionStage;
use crate::models::ChangeEvent;
use crate::pipeline::BatchReport;
use crate::scoring::ScoringStage;
use crate::store::{ChangeFeed, SequencedChange, Table};

/// What one dispatcher pass delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub raw_postings: Option<BatchReport>,
    pub structured_jobs: Option<BatchReport>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.raw_postings.is_none() && self.structured_jobs.is_none()
    }
}

/// Polls the change feed of both tables and hands each batch to its stage.
///
/// A batch is acknowledged only after its stage returns `Ok`. A failed batch stays
/// pending and is redelivered on the next pass, which the stages tolerate because
/// extraction overwrites by key and scoring writes back the same value.
pub struct Dispatcher {
    feed: Arc<dyn ChangeFeed>,
    extraction: Arc<ExtractionStage>,
    scoring: Arc<ScoringStage>,
    user_id: String,
    batch_size: usize,
}

impl Dispatcher {
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        extraction: Arc<ExtractionStage>,
        scoring: Arc<ScoringStage>,
        user_id: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            feed,
            extraction,
            scoring,
            user_id: user_id.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// One pass: raw postings first, then structured jobs.
    pub async fn tick(&self) -> Result<TickReport, AppError> {
        let raw = self.feed.poll(Table::RawPostings, self.batch_size).await?;
        let raw_postings = if raw.is_empty() {
            None
        } else {
            let report = self.extraction.handle_batch(&events_of(&raw)).await?;
            self.feed.ack(Table::RawPostings, &seqs_of(&raw)).await?;
            Some(report)
        };

        let structured = self
            .feed
            .poll(Table::StructuredJobs, self.batch_size)
            .await?;
        let structured_jobs = if structured.is_empty() {
            None
        } else {
            let report = self
                .scoring
                .handle_batch(&self.user_id, &events_of(&structured))
                .await?;
            self.feed
                .ack(Table::StructuredJobs, &seqs_of(&structured))
                .await?;
            Some(report)
        };

        Ok(TickReport {
            raw_postings,
            structured_jobs,
        })
    }

    /// Ticks until both feeds are empty. Returns the number of passes that delivered
    /// something. Errors if the feeds are still busy after `max_rounds`.
    #[cfg(test)]
    pub async fn drain(&self, max_rounds: usize) -> Result<usize, AppError> {
        for round in 0..max_rounds {
            if self.tick().await?.is_idle() {
                return Ok(round);
            }
        }
        Err(AppError::Internal(anyhow::anyhow!(
            "Change feed did not quiesce after {max_rounds} rounds"
        )))
    }

    /// Runs forever; spawn it as a background task. Errors are logged and the
    /// failed batch is retried on the next pass.
    pub async fn run(&self, poll_interval: Duration) {
        info!(
            batch_size = self.batch_size,
            poll_interval_secs = poll_interval.as_secs(),
            user_id = %self.user_id,
            "Change feed dispatcher starting"
        );

        loop {
            match self.tick().await {
                Ok(report) if report.is_idle() => debug!("No pending changes"),
                Ok(report) => info!(?report, "Delivered change batches"),
                Err(e) => error!(error = ?e, "Change feed dispatch failed; batch left pending"),
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

fn seqs_of(changes: &[SequencedChange]) -> Vec<i64> {
    changes.iter().map(|c| c.seq).collect()
}

fn events_of(changes: &[SequencedChange]) -> Vec<ChangeEvent> {
    changes.iter().map(|c| c.event.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::stage::tests::{fields, posting, StubExtractor};
    use crate::models::profile::ProfilePreferences;
    use crate::models::UserProfile;
    use crate::scoring::WeightedFitScorer;
    use crate::store::{MemoryStore, RecordStore};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use tokio::sync::Mutex;

    const USER: &str = "default_user";

    fn profile() -> UserProfile {
        UserProfile {
            user_id: USER.to_string(),
            top_skills: vec!["AWS".into(), "Kubernetes".into()],
            years_of_experience: 6.0,
            target_titles: vec!["Platform Engineer".into()],
            preferences: ProfilePreferences {
                remote_only: false,
                locations: vec!["Berlin".into()],
                min_salary: 0.0,
            },
        }
    }

    async fn build(
        extractor: StubExtractor,
        with_profile: bool,
    ) -> (Dispatcher, Arc<MemoryStore>, Arc<StubExtractor>) {
        let store = Arc::new(MemoryStore::new());
        if with_profile {
            store.insert_profile(profile()).await;
        }
        let extractor = Arc::new(extractor);
        let extraction = Arc::new(ExtractionStage::new(extractor.clone(), store.clone()));
        let scoring = Arc::new(ScoringStage::new(
            store.clone(),
            store.clone(),
            Arc::new(WeightedFitScorer::default()),
        ));
        let dispatcher = Dispatcher::new(store.clone(), extraction, scoring, USER, 10);
        (dispatcher, store, extractor)
    }

    #[tokio::test]
    async fn test_pipeline_quiesces_after_scoring() {
        let mut stub = StubExtractor::default();
        stub.answers.insert(
            "platform role".into(),
            fields("Senior Platform Engineer", &["aws", "kubernetes"]),
        );
        let (dispatcher, store, _) = build(stub, true).await;
        store.put_raw(&posting("p-1", "platform role")).await.unwrap();

        let rounds = dispatcher.drain(10).await.unwrap();

        // extraction + scoring, then the guard-skipped write-back
        assert_eq!(rounds, 2);
        let job = store.get_structured("p-1").await.unwrap().unwrap();
        // skills 50 + title 10; no location or experience data
        assert_eq!(job.fit_score, Some(60.0));
        assert_eq!(store.change_log(Table::StructuredJobs).await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_is_not_acked() {
        let stub = StubExtractor {
            fail_transport: true,
            ..Default::default()
        };
        let (dispatcher, store, extractor) = build(stub, true).await;
        store.put_raw(&posting("p-2", "anything")).await.unwrap();

        assert!(dispatcher.tick().await.is_err());
        assert!(dispatcher.tick().await.is_err());

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        let pending = store.poll(Table::RawPostings, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_profile_leaves_structured_batch_pending() {
        let mut stub = StubExtractor::default();
        stub.answers.insert("x".into(), fields("SRE", &["Linux"]));
        let (dispatcher, store, _) = build(stub, false).await;
        store.put_raw(&posting("p-3", "x")).await.unwrap();

        let err = dispatcher.tick().await.unwrap_err();

        assert!(matches!(err, AppError::MissingProfile(_)));
        assert!(store.poll(Table::RawPostings, 10).await.unwrap().is_empty());
        assert_eq!(store.poll(Table::StructuredJobs, 10).await.unwrap().len(), 1);
    }

    /// Hands out one fixed batch, then records what gets acknowledged.
    struct GappedFeed {
        batch: Mutex<Option<Vec<SequencedChange>>>,
        acked: Mutex<Vec<(Table, Vec<i64>)>>,
    }

    #[async_trait]
    impl ChangeFeed for GappedFeed {
        async fn poll(
            &self,
            table: Table,
            _limit: usize,
        ) -> Result<Vec<SequencedChange>, AppError> {
            if table != Table::RawPostings {
                return Ok(Vec::new());
            }
            Ok(self.batch.lock().await.take().unwrap_or_default())
        }

        async fn ack(&self, table: Table, seqs: &[i64]) -> Result<(), AppError> {
            self.acked.lock().await.push((table, seqs.to_vec()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_acks_exactly_the_polled_seqs() {
        let (_, store, extractor) = build(StubExtractor::default(), true).await;
        let raw = posting("p-4", "unknown");
        let change = |seq| SequencedChange {
            seq,
            event: ChangeEvent::new(
                crate::models::ChangeKind::Insert,
                &raw.job_id,
                serde_json::to_value(&raw).unwrap(),
            ),
        };
        // seq 41 is still uncommitted on another connection, so the batch skips it
        let feed = Arc::new(GappedFeed {
            batch: Mutex::new(Some(vec![change(40), change(42)])),
            acked: Mutex::new(Vec::new()),
        });
        let extraction = Arc::new(ExtractionStage::new(extractor, store.clone()));
        let scoring = Arc::new(ScoringStage::new(
            store.clone(),
            store.clone(),
            Arc::new(WeightedFitScorer::default()),
        ));
        let dispatcher = Dispatcher::new(feed.clone(), extraction, scoring, USER, 10);

        dispatcher.tick().await.unwrap();

        let acked = feed.acked.lock().await;
        assert_eq!(acked.as_slice(), &[(Table::RawPostings, vec![40, 42])]);
    }

    #[tokio::test]
    async fn test_idle_feed_drains_in_zero_rounds() {
        let (dispatcher, _, _) = build(StubExtractor::default(), true).await;
        assert_eq!(dispatcher.drain(1).await.unwrap(), 0);
    }
}
