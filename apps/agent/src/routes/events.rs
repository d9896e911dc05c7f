use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::ChangeEvent;
use crate::pipeline::BatchReport;
use crate::state::AppState;

/// A delivered batch, in delivery order.
#[derive(Deserialize)]
pub struct EventBatchRequest {
    #[serde(default)]
    pub records: Vec<ChangeEvent>,
}

/// POST /api/v1/events/raw
pub async fn handle_raw_events(
    State(state): State<AppState>,
    Json(req): Json<EventBatchRequest>,
) -> Result<Json<BatchReport>, AppError> {
    let report = state.extraction.handle_batch(&req.records).await?;
    Ok(Json(report))
}

/// POST /api/v1/events/structured
pub async fn handle_structured_events(
    State(state): State<AppState>,
    Json(req): Json<EventBatchRequest>,
) -> Result<Json<BatchReport>, AppError> {
    let report = state
        .scoring
        .handle_batch(&state.profile_user_id, &req.records)
        .await?;
    Ok(Json(report))
}
