use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type shared by every pipeline stage.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Extraction that yields no structure and loop-guard skips are outcomes, not errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A stored record that cannot be coerced into the shape a stage needs.
    /// Stages log and skip the event; the batch continues.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Nothing can be scored without the profile. Fails the whole scoring batch.
    #[error("User profile '{0}' not found")]
    MissingProfile(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for collaborator failures (store, extractor, sender). These propagate out
    /// of a batch so the delivery side can redeliver or dead-letter.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Llm(_) | AppError::Email(_) | AppError::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::MalformedRecord(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MALFORMED_RECORD",
                msg.clone(),
            ),
            AppError::MissingProfile(user_id) => {
                tracing::error!("Scoring profile missing: {user_id}");
                (
                    StatusCode::NOT_FOUND,
                    "MISSING_PROFILE",
                    format!("User profile '{user_id}' not found"),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Email(msg) => {
                tracing::error!("Email error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMAIL_ERROR",
                    "The digest could not be sent".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(AppError::Llm("timeout".into()).is_transport());
        assert!(AppError::Email("relay refused".into()).is_transport());
        assert!(!AppError::MalformedRecord("bad skills".into()).is_transport());
        assert!(!AppError::MissingProfile("default_user".into()).is_transport());
    }

    #[test]
    fn test_missing_profile_maps_to_404() {
        let response = AppError::MissingProfile("default_user".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_llm_error_maps_to_bad_gateway() {
        let response = AppError::Llm("503".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
