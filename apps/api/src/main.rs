mod agent;
mod cache;
mod config;
mod conversation;
mod errors;
mod llm_client;
mod matching;
mod models;
mod preferences;
mod providers;
mod refresh;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{ChatModel, LlmClient};
use crate::models::candidate::CandidateProfile;
use crate::providers::hashing::HashingEmbedder;
use crate::providers::http::HttpEmbedder;
use crate::providers::index::InMemoryIndex;
use crate::providers::{Embedder, SimilarityIndex};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::file::JsonFileStore;
use crate::store::jobs::JobPool;
use crate::store::profiles::ProfileStore;
use crate::store::RecordStore;

const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobmatch API v{}", env!("CARGO_PKG_VERSION"));

    // Job pool (read-only for the life of the process)
    let jobs = Arc::new(JobPool::load(&config.jobs_path()).await?);
    if jobs.is_empty() {
        warn!("No job postings loaded from {}", config.jobs_path().display());
    }

    // Candidate profiles
    let store = JsonFileStore::open(config.candidates_dir()).await?;
    info!("Candidate store at {}", store.dir().display());
    let backend: Arc<dyn RecordStore<CandidateProfile>> = Arc::new(store);
    let profiles = Arc::new(ProfileStore::load(backend).await?);

    // Similarity collaborators
    let embedder = build_embedder(&config)?;
    let index: Arc<dyn SimilarityIndex> = Arc::new(InMemoryIndex::new(config.embedding_dimensions));
    info!(
        "Embedder initialized ({}, {} dimensions)",
        embedder.name(),
        config.embedding_dimensions
    );

    // Initialize LLM client
    let llm: Arc<dyn ChatModel> = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build app state (starts the refresh workers)
    let state = AppState::assemble(
        config.clone(),
        profiles,
        jobs.clone(),
        embedder,
        index,
        llm,
    );

    state.spawn_housekeeping();

    // Warm the index in the background; searches degrade to keyword order until done.
    let refresh = state.refresh.clone();
    let warm_jobs = jobs.clone();
    tokio::spawn(async move {
        refresh.warm_jobs(warm_jobs.all()).await;
    });

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Remote embeddings when `EMBEDDING_API_URL` is set, the local hashing embedder otherwise.
fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match &config.embedding_api_url {
        Some(url) => Ok(Arc::new(HttpEmbedder::new(
            url,
            config.embedding_api_key.as_deref(),
            config.embedding_model.clone(),
            config.embedding_dimensions,
            EMBEDDING_TIMEOUT,
        )?)),
        None => Ok(Arc::new(HashingEmbedder::new(config.embedding_dimensions))),
    }
}
