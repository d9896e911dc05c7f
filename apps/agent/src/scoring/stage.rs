//! Scoring Stage: structured-record change events → `fit_score` write-back.
//!
//! The stage writes to the table it listens on, so its own write comes back as a
//! Modify event. Loop guard: a Modify whose image already carries `fit_score` is
//! a no-op. Inserts are always scored.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::{ChangeEvent, ChangeKind, UserProfile};
use crate::pipeline::BatchReport;
use crate::scoring::fit_scoring::{FitScorer, ScoringInput};
use crate::store::{ProfileSource, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoringOutcome {
    Scored(f64),
    /// Loop guard tripped: the Modify already carries a score.
    GuardSkipped,
    /// Delete or an unknown event kind.
    Ignored,
}

pub struct ScoringStage {
    store: Arc<dyn RecordStore>,
    profiles: Arc<dyn ProfileSource>,
    scorer: Arc<dyn FitScorer>,
}

/// True when the triggering image already holds a non-null `fit_score`.
pub fn carries_fit_score(image: Option<&Value>) -> bool {
    image
        .and_then(|v| v.get("fit_score"))
        .map(|score| !score.is_null())
        .unwrap_or(false)
}

impl ScoringStage {
    pub fn new(
        store: Arc<dyn RecordStore>,
        profiles: Arc<dyn ProfileSource>,
        scorer: Arc<dyn FitScorer>,
    ) -> Self {
        Self {
            store,
            profiles,
            scorer,
        }
    }

    /// Loads the profile a batch is scored against. Missing profile fails the batch.
    pub async fn load_profile(&self, user_id: &str) -> Result<UserProfile, AppError> {
        self.profiles
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::MissingProfile(user_id.to_string()))
    }

    /// Scores one change event and writes the score back in place.
    pub async fn on_change(
        &self,
        event: &ChangeEvent,
        profile: &UserProfile,
    ) -> Result<ScoringOutcome, AppError> {
        match event.event_kind {
            ChangeKind::Insert => {}
            ChangeKind::Modify => {
                if carries_fit_score(event.new_image.as_ref()) {
                    debug!(job_id = %event.key, "Modify already carries fit_score; skipping");
                    return Ok(ScoringOutcome::GuardSkipped);
                }
            }
            ChangeKind::Delete | ChangeKind::Other => return Ok(ScoringOutcome::Ignored),
        }

        let image = event
            .new_image
            .as_ref()
            .ok_or_else(|| AppError::MalformedRecord("change event has no image".to_string()))?;
        let input = ScoringInput::from_image(image)?;

        let breakdown = self.scorer.score(&input, profile);
        info!(
            job_id = %input.job_id,
            skills = breakdown.skills,
            location = breakdown.location,
            experience = breakdown.experience,
            title = breakdown.title,
            "Scoring job"
        );

        self.store
            .update_fit_score(&input.job_id, breakdown.total)
            .await?;

        info!(job_id = %input.job_id, fit_score = breakdown.total, "Job scored");
        Ok(ScoringOutcome::Scored(breakdown.total))
    }

    /// Processes a delivery batch against `user_id`'s profile, loaded once.
    /// Malformed records are skipped; transport errors abort the batch.
    pub async fn handle_batch(
        &self,
        user_id: &str,
        events: &[ChangeEvent],
    ) -> Result<BatchReport, AppError> {
        let profile = self.load_profile(user_id).await?;
        let mut report = BatchReport::new(events.len());

        for event in events {
            match self.on_change(event, &profile).await {
                Ok(ScoringOutcome::Scored(_)) => report.processed += 1,
                Ok(ScoringOutcome::GuardSkipped | ScoringOutcome::Ignored) => report.ignored += 1,
                Err(e) if !e.is_transport() => {
                    warn!(job_id = %event.key, "Skipping structured job event: {e}");
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            ignored = report.ignored,
            "Scoring batch complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{ExperienceRange, RemotePolicy};
    use crate::models::profile::ProfilePreferences;
    use crate::models::{StructuredFields, StructuredJob};
    use crate::scoring::fit_scoring::WeightedFitScorer;
    use crate::store::{MemoryStore, Table};
    use chrono::Utc;
    use serde_json::json;

    const USER: &str = "default_user";

    fn profile() -> UserProfile {
        UserProfile {
            user_id: USER.to_string(),
            top_skills: vec!["AWS".into(), "Terraform".into()],
            years_of_experience: 5.0,
            target_titles: vec!["Cloud Security Engineer".into()],
            preferences: ProfilePreferences {
                remote_only: true,
                locations: vec![],
                min_salary: 0.0,
            },
        }
    }

    fn structured(job_id: &str) -> StructuredJob {
        let fields = StructuredFields {
            job_title: Some("Senior Cloud Security Engineer".into()),
            remote_policy: RemotePolicy::Remote,
            required_skills: vec!["aws".into(), "terraform".into()],
            years_of_experience: ExperienceRange {
                min: Some(5.0),
                ..Default::default()
            },
            ..Default::default()
        };
        StructuredJob::from_extraction(job_id, fields, Utc::now())
    }

    async fn setup(with_profile: bool) -> (ScoringStage, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        if with_profile {
            store.insert_profile(profile()).await;
        }
        let stage = ScoringStage::new(
            store.clone(),
            store.clone(),
            Arc::new(WeightedFitScorer::default()),
        );
        (stage, store)
    }

    #[tokio::test]
    async fn test_insert_is_scored_and_written_back() {
        let (stage, store) = setup(true).await;
        store.put_structured(&structured("j-1")).await.unwrap();
        let events = store.change_log(Table::StructuredJobs).await;

        let report = stage.handle_batch(USER, &events).await.unwrap();

        assert_eq!(report.processed, 1);
        let job = store.get_structured("j-1").await.unwrap().unwrap();
        assert_eq!(job.fit_score, Some(100.0));
    }

    #[tokio::test]
    async fn test_own_write_back_never_rescored() {
        let (stage, store) = setup(true).await;
        store.put_structured(&structured("j-2")).await.unwrap();
        let insert = store.change_log(Table::StructuredJobs).await;
        stage.handle_batch(USER, &insert).await.unwrap();

        let log = store.change_log(Table::StructuredJobs).await;
        assert_eq!(log.len(), 2);
        let self_write = &log[1..];

        let report = stage.handle_batch(USER, self_write).await.unwrap();

        assert_eq!(report.processed, 0);
        assert_eq!(report.ignored, 1);
        assert_eq!(store.change_log(Table::StructuredJobs).await.len(), 2);
    }

    #[tokio::test]
    async fn test_modify_without_score_is_scored() {
        let (stage, store) = setup(true).await;
        let mut job = structured("j-3");
        job.fit_score = None;
        store.put_structured(&job).await.unwrap();
        let image = serde_json::to_value(&job).unwrap();
        assert!(image.get("fit_score").is_none());

        let event = ChangeEvent::new(ChangeKind::Modify, "j-3", image);
        let outcome = stage.on_change(&event, &profile()).await.unwrap();

        assert_eq!(outcome, ScoringOutcome::Scored(100.0));
    }

    #[tokio::test]
    async fn test_missing_profile_fails_whole_batch() {
        let (stage, store) = setup(false).await;
        store.put_structured(&structured("j-4")).await.unwrap();
        let events = store.change_log(Table::StructuredJobs).await;

        let err = stage.handle_batch(USER, &events).await.unwrap_err();

        assert!(matches!(err, AppError::MissingProfile(ref id) if id == USER));
        let job = store.get_structured("j-4").await.unwrap().unwrap();
        assert_eq!(job.fit_score, Some(0.0));
    }

    #[tokio::test]
    async fn test_malformed_event_skipped_batch_continues() {
        let (stage, store) = setup(true).await;
        store.put_structured(&structured("j-5")).await.unwrap();
        let mut events = vec![ChangeEvent::new(
            ChangeKind::Insert,
            "bad",
            json!({"job_id": "bad", "required_skills": {"AWS": true}}),
        )];
        events.extend(store.change_log(Table::StructuredJobs).await);

        let report = stage.handle_batch(USER, &events).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.processed, 1);
    }

    #[tokio::test]
    async fn test_delete_ignored() {
        let (stage, _store) = setup(true).await;
        let event = ChangeEvent {
            event_kind: ChangeKind::Delete,
            key: "j-6".into(),
            new_image: None,
        };
        let outcome = stage.on_change(&event, &profile()).await.unwrap();
        assert_eq!(outcome, ScoringOutcome::Ignored);
    }

    #[test]
    fn test_null_fit_score_does_not_trip_guard() {
        assert!(!carries_fit_score(Some(&json!({"fit_score": null}))));
        assert!(carries_fit_score(Some(&json!({"fit_score": 0}))));
        assert!(!carries_fit_score(None));
    }
}
