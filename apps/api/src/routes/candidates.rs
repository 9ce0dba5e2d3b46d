//! Axum route handlers for the Candidate API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::matcher::MatchResult;
use crate::matching::service::MAX_MATCHES;
use crate::models::candidate::CandidateProfile;
use crate::preferences::{InvalidPreferenceValue, PreferenceField, PreferenceUpdate};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CandidateListResponse {
    pub candidates: Vec<CandidateProfile>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateCandidateRequest {
    /// Generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub current_title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub years_experience: u32,
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub profile: CandidateProfile,
    pub changed_fields: Vec<PreferenceField>,
    pub rejected: Vec<InvalidPreferenceValue>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeclineRequest {
    pub job_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeclineResponse {
    pub newly_declined: Vec<String>,
    pub declined_job_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub limit: Option<usize>,
    pub criteria: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
) -> Result<Json<CandidateListResponse>, AppError> {
    let candidates = state.profiles.list().await;
    Ok(Json(CandidateListResponse {
        total: candidates.len(),
        candidates,
    }))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<CandidateProfile>, AppError> {
    Ok(Json(state.profiles.get(&candidate_id).await?))
}

/// POST /api/v1/candidates
///
/// Creates a candidate with empty preferences. Existing ids are refused.
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    Json(request): Json<CreateCandidateRequest>,
) -> Result<Json<CandidateProfile>, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let id = match request.id.as_deref().map(str::trim) {
        Some(id) => {
            if !is_valid_id(id) {
                return Err(AppError::Validation(
                    "id may only contain letters, digits, '-' and '_'".to_string(),
                ));
            }
            id.to_string()
        }
        None => Uuid::new_v4().to_string(),
    };
    let profile = CandidateProfile {
        id,
        name: name.to_string(),
        email: request.email,
        summary: request.summary,
        current_title: request.current_title,
        skills: request.skills,
        years_experience: request.years_experience,
        ..CandidateProfile::default()
    };
    state.profiles.create(profile.clone()).await?;
    state.commands.refresh_candidate(&profile);

    Ok(Json(profile))
}

/// PATCH /api/v1/candidates/:id/preferences
///
/// Invalid fields are reported in `rejected` while valid ones apply. 422 when
/// nothing valid was supplied.
pub async fn handle_update_preferences(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
    Json(update): Json<PreferenceUpdate>,
) -> Result<Json<PreferencesResponse>, AppError> {
    let update = state
        .commands
        .update_preferences(&candidate_id, update)
        .await?;

    Ok(Json(PreferencesResponse {
        profile: update.profile,
        changed_fields: update.changed.into_iter().collect(),
        rejected: update.rejected,
    }))
}

/// POST /api/v1/candidates/:id/accept
pub async fn handle_accept_job(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
    Json(request): Json<AcceptRequest>,
) -> Result<Json<CandidateProfile>, AppError> {
    if !state.jobs.contains(&request.job_id) {
        return Err(AppError::job_not_found(&request.job_id));
    }
    let profile = state.profiles.accept(&candidate_id, &request.job_id).await?;
    Ok(Json(profile))
}

/// POST /api/v1/candidates/:id/decline
pub async fn handle_decline_jobs(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
    Json(request): Json<DeclineRequest>,
) -> Result<Json<DeclineResponse>, AppError> {
    let outcome = state
        .commands
        .decline(&candidate_id, &request.job_ids)
        .await?;

    Ok(Json(DeclineResponse {
        newly_declined: outcome.newly_declined,
        declined_job_ids: outcome.profile.declined_job_ids,
    }))
}

/// GET /api/v1/candidates/:id/matches?limit=&criteria=
pub async fn handle_get_matches(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
    Query(query): Query<MatchesQuery>,
) -> Result<Json<MatchResult>, AppError> {
    let limit = query
        .limit
        .unwrap_or(state.commands.default_num_results())
        .min(MAX_MATCHES);

    let result = state
        .matcher
        .search(&candidate_id, query.criteria.as_deref(), limit)
        .await?;

    Ok(Json(result))
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
