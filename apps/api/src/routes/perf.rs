use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::cache::CacheStats;
use crate::refresh::QueueStatus;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PerfStatsResponse {
    pub search_cache: CacheStats,
    pub candidate_cache: CacheStats,
    pub refresh_queue: QueueStatus,
    pub candidates: usize,
    pub jobs: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub cleared_entries: usize,
}

/// GET /api/v1/perf/stats
/// Read-only; expired entries are swept by the housekeeping task.
pub async fn handle_perf_stats(State(state): State<AppState>) -> Json<PerfStatsResponse> {
    Json(PerfStatsResponse {
        search_cache: state.search_cache.stats(),
        candidate_cache: state.candidate_cache.stats(),
        refresh_queue: state.refresh.status(),
        candidates: state.profiles.list().await.len(),
        jobs: state.jobs.len(),
    })
}

/// POST /api/v1/perf/cache/clear
pub async fn handle_clear_cache(State(state): State<AppState>) -> Json<CacheClearResponse> {
    let cleared_entries = state.search_cache.stats().size + state.candidate_cache.stats().size;
    state.search_cache.clear();
    state.candidate_cache.clear();
    info!(cleared_entries, "caches cleared");

    Json(CacheClearResponse { cleared_entries })
}
