use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::RawPosting;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePostingRequest {
    /// Producer-assigned id; a UUID is minted when absent.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub raw_description: String,
}

#[derive(Serialize)]
pub struct CreatePostingResponse {
    pub job_id: String,
}

/// POST /api/v1/postings
pub async fn handle_create_posting(
    State(state): State<AppState>,
    Json(req): Json<CreatePostingRequest>,
) -> Result<(StatusCode, Json<CreatePostingResponse>), AppError> {
    if req.raw_description.trim().is_empty() {
        return Err(AppError::Validation(
            "raw_description must not be empty".to_string(),
        ));
    }

    let job_id = req
        .job_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let posting = RawPosting {
        job_id: job_id.clone(),
        title: req.title,
        company: req.company,
        raw_description: req.raw_description,
        scraped_at: Utc::now(),
    };
    state.store.put_raw(&posting).await?;

    info!(job_id = %job_id, "Raw posting accepted");
    Ok((StatusCode::CREATED, Json(CreatePostingResponse { job_id })))
}
