use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::preferences::InvalidPreferenceValue;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid preference value: {0}")]
    InvalidPreference(InvalidPreferenceValue),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Similarity search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn candidate_not_found(candidate_id: &str) -> Self {
        AppError::NotFound(format!("Candidate {candidate_id} not found"))
    }

    pub fn job_not_found(job_id: &str) -> Self {
        AppError::NotFound(format!("Job {job_id} not found"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidPreference(invalid) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_PREFERENCE_VALUE",
                invalid.to_string(),
            ),
            AppError::LlmUnavailable(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "LLM_UNAVAILABLE",
                    "The assistant is unavailable right now. Please try again.".to_string(),
                )
            }
            AppError::SearchUnavailable(msg) => {
                tracing::warn!("Similarity search error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SEARCH_UNAVAILABLE",
                    "Similarity search is not available right now".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
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
