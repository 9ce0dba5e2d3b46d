//! Axum route handlers for the Chat and Session API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::chat::ChatResponse;
use crate::errors::AppError;
use crate::models::conversation::{ConversationTurn, SessionInfo};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub candidate_id: String,
    pub message: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub candidate_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionHistoryResponse {
    pub session_id: Uuid,
    pub candidate_id: String,
    pub messages: Vec<ConversationTurn>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/chat
///
/// Runs one conversational turn. A missing or unknown `session_id` starts a new
/// session; the id to reuse is returned in the response.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.candidate_id.trim().is_empty() {
        return Err(AppError::Validation("candidate_id cannot be empty".to_string()));
    }

    let response = state
        .chat
        .chat(&request.candidate_id, request.session_id, &request.message)
        .await?;

    Ok(Json(response))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<SessionInfo>, AppError> {
    if !state.profiles.exists(&request.candidate_id).await {
        return Err(AppError::candidate_not_found(&request.candidate_id));
    }
    Ok(Json(state.sessions.create(&request.candidate_id).await))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionInfo>, AppError> {
    Ok(Json(state.sessions.info(session_id).await?))
}

/// GET /api/v1/sessions/:id/history
pub async fn handle_session_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionHistoryResponse>, AppError> {
    let candidate_id = state.sessions.candidate_of(session_id).await?;
    let messages = state.sessions.history(session_id).await?;

    Ok(Json(SessionHistoryResponse {
        session_id,
        candidate_id,
        messages,
    }))
}
