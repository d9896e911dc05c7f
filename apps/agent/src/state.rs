use std::sync::Arc;

use crate::digest::DigestStage;
use crate::extraction::ExtractionStage;
use crate::scoring::ScoringStage;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub extraction: Arc<ExtractionStage>,
    pub scoring: Arc<ScoringStage>,
    pub digest: Arc<DigestStage>,
    /// Profile every scoring batch is evaluated against.
    pub profile_user_id: String,
}
