pub mod candidates;
pub mod health;
pub mod jobs;
pub mod perf;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::agent::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/api/v1/chat", post(handlers::handle_chat))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_session))
        .route(
            "/api/v1/sessions/:id/history",
            get(handlers::handle_session_history),
        )
        // Candidate API
        .route(
            "/api/v1/candidates",
            get(candidates::handle_list_candidates).post(candidates::handle_create_candidate),
        )
        .route("/api/v1/candidates/:id", get(candidates::handle_get_candidate))
        .route(
            "/api/v1/candidates/:id/preferences",
            patch(candidates::handle_update_preferences),
        )
        .route(
            "/api/v1/candidates/:id/accept",
            post(candidates::handle_accept_job),
        )
        .route(
            "/api/v1/candidates/:id/decline",
            post(candidates::handle_decline_jobs),
        )
        .route(
            "/api/v1/candidates/:id/matches",
            get(candidates::handle_get_matches),
        )
        // Job API
        .route("/api/v1/jobs", get(jobs::handle_list_jobs))
        .route("/api/v1/jobs/search", get(jobs::handle_search_jobs))
        .route("/api/v1/jobs/:id", get(jobs::handle_get_job))
        // Performance API
        .route("/api/v1/perf/stats", get(perf::handle_perf_stats))
        .route("/api/v1/perf/cache/clear", post(perf::handle_clear_cache))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::agent::commands::tests::posting;
    use crate::config::Config;
    use crate::llm_client::{
        ChatMessage, ChatModel, ContentBlock, LlmError, ModelReply, ToolDefinition,
    };
    use crate::matching::matcher::MatchResult;
    use crate::models::candidate::CandidateProfile;
    use crate::providers::hashing::HashingEmbedder;
    use crate::providers::index::InMemoryIndex;
    use crate::providers::{EntityKind, SimilarityIndex};
    use crate::store::jobs::JobPool;
    use crate::store::profiles::ProfileStore;
    use crate::store::{MemoryStore, RecordStore};

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(
            &self,
            _system: &str,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ModelReply, LlmError> {
            Ok(ModelReply {
                content: vec![ContentBlock::Text {
                    text: "Happy to help.".to_string(),
                }],
                stop_reason: Some("end_turn".to_string()),
            })
        }
    }

    async fn test_state() -> AppState {
        let backend: Arc<dyn RecordStore<CandidateProfile>> = Arc::new(MemoryStore::new());
        let profile = CandidateProfile {
            id: "c1".to_string(),
            name: "Sam".to_string(),
            ..CandidateProfile::default()
        };
        backend.save("c1", &profile).await.unwrap();
        let profiles = Arc::new(ProfileStore::load(backend).await.unwrap());

        let jobs = Arc::new(JobPool::new(vec![
            posting("j1", "Delivery Driver", 50_000),
            posting("j2", "Truck Driver", 65_000),
            posting("j3", "Dispatcher", 45_000),
        ]));
        let embedder = Arc::new(HashingEmbedder::new(256));
        let index = Arc::new(InMemoryIndex::new(256));
        for job in jobs.all() {
            index
                .upsert(
                    EntityKind::Job,
                    &job.id,
                    embedder.embed_sync(&job.to_embedding_text()),
                )
                .await
                .unwrap();
        }

        AppState::assemble(
            Config::for_tests(),
            profiles,
            jobs,
            embedder,
            index,
            Arc::new(EchoModel),
        )
    }

    async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state().await;
        let (status, body) = send(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "jobmatch");
        assert_eq!(body["jobs_loaded"], 3);
    }

    #[tokio::test]
    async fn test_chat_round_trip_and_history() {
        let state = test_state().await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/chat",
            Some(json!({"candidate_id": "c1", "message": "I want remote work"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Happy to help.");
        assert_eq!(body["changed_fields"], json!(["preferred_location_types"]));

        let session_id = body["session_id"].as_str().unwrap().to_string();
        let (status, history) = send(
            &state,
            "GET",
            &format!("/api/v1/sessions/{session_id}/history"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["candidate_id"], "c1");
        assert_eq!(history["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_unknown_candidate_is_404() {
        let state = test_state().await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/chat",
            Some(json!({"candidate_id": "ghost", "message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_and_fetch_candidate() {
        let state = test_state().await;
        let (status, created) = send(
            &state,
            "POST",
            "/api/v1/candidates",
            Some(json!({"id": "c2", "name": "Alex", "skills": ["CDL"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["id"], "c2");

        let (status, _) = send(
            &state,
            "POST",
            "/api/v1/candidates",
            Some(json!({"id": "c2", "name": "Alex again"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, list) = send(&state, "GET", "/api/v1/candidates", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 2);
    }

    #[tokio::test]
    async fn test_patch_preferences_partial_and_all_invalid() {
        let state = test_state().await;
        let (status, body) = send(
            &state,
            "PATCH",
            "/api/v1/candidates/c1/preferences",
            Some(json!({"min_salary": 60000, "preferred_location_types": ["mars"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"]["min_salary"], 60000);
        assert_eq!(body["rejected"][0]["field"], "preferred_location_types");

        let (status, body) = send(
            &state,
            "PATCH",
            "/api/v1/candidates/c1/preferences",
            Some(json!({"min_salary": -10})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INVALID_PREFERENCE_VALUE");
    }

    #[tokio::test]
    async fn test_matches_exclude_declined_jobs() {
        let state = test_state().await;
        let (status, _) = send(
            &state,
            "POST",
            "/api/v1/candidates/c1/decline",
            Some(json!({"job_ids": ["j2"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&state, "GET", "/api/v1/candidates/c1/matches?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "matches");
        let ids: Vec<&str> = body["ranked"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["job"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&"j2"));
    }

    #[tokio::test]
    async fn test_accept_unknown_job_is_404() {
        let state = test_state().await;
        let (status, _) = send(
            &state,
            "POST",
            "/api/v1/candidates/c1/accept",
            Some(json!({"job_id": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &state,
            "POST",
            "/api/v1/candidates/c1/accept",
            Some(json!({"job_id": "j1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted_job_id"], "j1");
    }

    #[tokio::test]
    async fn test_job_listing_search_and_lookup() {
        let state = test_state().await;
        let (status, page) =
            send(&state, "GET", "/api/v1/jobs?limit=2&offset=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 3);
        assert_eq!(page["jobs"].as_array().unwrap().len(), 2);

        let (status, found) = send(
            &state,
            "GET",
            "/api/v1/jobs/search?query=Dispatcher&limit=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["results"].as_array().unwrap().len(), 1);

        let (status, _) = send(&state, "GET", "/api/v1/jobs/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stats_read_leaves_expired_entries_for_the_sweep() {
        let state = test_state().await;
        state.search_cache.set(
            "search:stale",
            MatchResult::Matches { ranked: vec![] },
            Duration::from_millis(1),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (status, stats) = send(&state, "GET", "/api/v1/perf/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["search_cache"]["size"], 1);

        assert_eq!(state.sweep().await, (1, 0));
        assert_eq!(state.search_cache.stats().size, 0);
    }

    #[tokio::test]
    async fn test_perf_stats_and_cache_clear() {
        let state = test_state().await;
        send(&state, "GET", "/api/v1/candidates/c1/matches", None).await;
        send(&state, "GET", "/api/v1/candidates/c1/matches", None).await;

        let (status, stats) = send(&state, "GET", "/api/v1/perf/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["search_cache"]["hits"], 1);
        assert_eq!(stats["search_cache"]["size"], 1);

        let (status, cleared) = send(&state, "POST", "/api/v1/perf/cache/clear", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["cleared_entries"], 1);
        assert_eq!(state.search_cache.stats().size, 0);
    }
}
