pub mod digest;
pub mod events;
pub mod health;
pub mod jobs;
pub mod postings;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Producer edge
        .route("/api/v1/postings", post(postings::handle_create_posting))
        // Change-event delivery (external feed or replay)
        .route("/api/v1/events/raw", post(events::handle_raw_events))
        .route(
            "/api/v1/events/structured",
            post(events::handle_structured_events),
        )
        .route("/api/v1/digest/run", post(digest::handle_run_digest))
        // Feed view
        .route("/api/v1/jobs", get(jobs::handle_list_jobs))
        .route("/api/v1/jobs/:job_id", get(jobs::handle_get_job))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::digest::stage::tests::RecordingSender;
    use crate::digest::DigestStage;
    use crate::extraction::stage::tests::StubExtractor;
    use crate::extraction::ExtractionStage;
    use crate::models::profile::ProfilePreferences;
    use crate::models::UserProfile;
    use crate::scoring::{ScoringStage, WeightedFitScorer};
    use crate::state::AppState;
    use crate::store::MemoryStore;

    pub const USER: &str = "default_user";

    pub fn profile() -> UserProfile {
        UserProfile {
            user_id: USER.to_string(),
            top_skills: vec!["AWS".into(), "Python".into()],
            years_of_experience: 4.0,
            target_titles: vec!["Security Engineer".into()],
            preferences: ProfilePreferences {
                remote_only: true,
                locations: vec![],
                min_salary: 0.0,
            },
        }
    }

    /// AppState over a fresh MemoryStore with the default profile seeded.
    pub async fn state_with(
        extractor: StubExtractor,
    ) -> (AppState, Arc<MemoryStore>, Arc<RecordingSender>) {
        let store = Arc::new(MemoryStore::new());
        store.insert_profile(profile()).await;
        let sender = Arc::new(RecordingSender::default());

        let state = AppState {
            store: store.clone(),
            extraction: Arc::new(ExtractionStage::new(Arc::new(extractor), store.clone())),
            scoring: Arc::new(ScoringStage::new(
                store.clone(),
                store.clone(),
                Arc::new(WeightedFitScorer::default()),
            )),
            digest: Arc::new(DigestStage::new(store.clone(), sender.clone(), "me@example.com")),
            profile_user_id: USER.to_string(),
        };
        (state, store, sender)
    }

    pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
