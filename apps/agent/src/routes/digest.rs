use axum::{extract::State, Json};
use chrono::Utc;

use crate::digest::DigestResult;
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/v1/digest/run
pub async fn handle_run_digest(
    State(state): State<AppState>,
) -> Result<Json<DigestResult>, AppError> {
    let result = state.digest.run(Utc::now()).await?;
    Ok(Json(result))
}
