use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::digest::sort_by_score_desc;
use crate::errors::AppError;
use crate::models::StructuredJob;
use crate::state::AppState;
use crate::store::ScanFilter;

const DEFAULT_SINCE_HOURS: i64 = 24 * 7;

#[derive(Deserialize)]
pub struct JobListQuery {
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub since_hours: Option<i64>,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> Result<Json<Vec<StructuredJob>>, AppError> {
    let min_score = params.min_score.unwrap_or(0.0);
    if !(0.0..=100.0).contains(&min_score) {
        return Err(AppError::Validation(
            "min_score must be between 0 and 100".to_string(),
        ));
    }
    let since_hours = params.since_hours.unwrap_or(DEFAULT_SINCE_HOURS);
    if since_hours <= 0 {
        return Err(AppError::Validation(
            "since_hours must be positive".to_string(),
        ));
    }

    let filter = ScanFilter {
        min_fit_score: min_score,
        analyzed_after: Utc::now() - Duration::hours(since_hours),
    };
    let mut jobs = state.store.scan_structured(&filter).await?;
    sort_by_score_desc(&mut jobs);
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/:job_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StructuredJob>, AppError> {
    let job = state
        .store
        .get_structured(&job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    Ok(Json(job))
}
