//! Axum route handlers for the Job API. The pool is read-only.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::matcher::RankedJob;
use crate::models::job::JobPosting;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobPosting>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchJobsQuery {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct JobSearchResponse {
    pub query: String,
    pub results: Vec<RankedJob>,
}

/// GET /api/v1/jobs?limit=&offset=
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    Ok(Json(JobListResponse {
        jobs: state.jobs.page(offset, limit).to_vec(),
        total: state.jobs.len(),
        offset,
        limit,
    }))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobPosting>, AppError> {
    state
        .jobs
        .get(&job_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::job_not_found(&job_id))
}

/// GET /api/v1/jobs/search?query=&limit=
///
/// Pure similarity search over the pool, without any candidate filters.
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    Query(query): Query<SearchJobsQuery>,
) -> Result<Json<JobSearchResponse>, AppError> {
    let text = query.query.trim();
    if text.is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_PAGE_SIZE);

    let results = state.matcher.search_text(text, limit).await?;

    Ok(Json(JobSearchResponse {
        query: text.to_string(),
        results,
    }))
}
