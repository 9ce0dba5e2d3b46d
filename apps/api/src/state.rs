use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::agent::chat::ChatOrchestrator;
use crate::agent::commands::CommandRegistry;
use crate::cache::TtlCache;
use crate::config::Config;
use crate::conversation::context::ContextBuilder;
use crate::conversation::sessions::SessionStore;
use crate::llm_client::ChatModel;
use crate::matching::matcher::MatchResult;
use crate::matching::service::MatchService;
use crate::providers::{Embedder, SimilarityIndex};
use crate::refresh::{RefreshQueue, RefreshSettings};
use crate::store::jobs::JobPool;
use crate::store::profiles::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileStore>,
    /// Read-only after startup.
    pub jobs: Arc<JobPool>,
    pub sessions: Arc<SessionStore>,
    pub matcher: Arc<MatchService>,
    pub commands: Arc<CommandRegistry>,
    pub chat: Arc<ChatOrchestrator>,
    pub refresh: RefreshQueue,
    /// Memoized search results, keyed by candidate fingerprint.
    pub search_cache: Arc<TtlCache<MatchResult>>,
    /// Memoized candidate existence checks for the chat path.
    pub candidate_cache: Arc<TtlCache<bool>>,
    pub config: Config,
}

impl AppState {
    /// Wires the services together and starts the refresh workers on the current runtime.
    pub fn assemble(
        config: Config,
        profiles: Arc<ProfileStore>,
        jobs: Arc<JobPool>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
        llm: Arc<dyn ChatModel>,
    ) -> Self {
        let search_cache = Arc::new(TtlCache::new(config.cache_max_entries));
        let candidate_cache = Arc::new(TtlCache::new(config.cache_max_entries));

        let refresh = RefreshQueue::start(
            RefreshSettings {
                workers: config.refresh_workers,
                capacity: config.refresh_queue_capacity,
                max_attempts: config.refresh_max_attempts,
                ..RefreshSettings::default()
            },
            embedder.clone(),
            index.clone(),
        );

        let matcher = Arc::new(MatchService::new(
            profiles.clone(),
            jobs.clone(),
            embedder,
            index,
            search_cache.clone(),
            config.cache_ttl,
        ));
        let commands = Arc::new(CommandRegistry::new(
            profiles.clone(),
            jobs.clone(),
            matcher.clone(),
            refresh.clone(),
            config.default_num_results,
        ));
        let sessions = Arc::new(SessionStore::new());
        let chat = Arc::new(ChatOrchestrator::new(
            profiles.clone(),
            sessions.clone(),
            commands.clone(),
            llm,
            ContextBuilder::new(config.history_turns),
            candidate_cache.clone(),
            config.cache_ttl,
        ));

        Self {
            profiles,
            jobs,
            sessions,
            matcher,
            commands,
            chat,
            refresh,
            search_cache,
            candidate_cache,
            config,
        }
    }

    /// Sweeps expired cache entries and idle sessions every `housekeeping_interval`.
    pub fn spawn_housekeeping(&self) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(state.config.housekeeping_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state.sweep().await;
            }
        })
    }

    /// One housekeeping pass. Returns `(expired cache entries, evicted sessions)`.
    pub async fn sweep(&self) -> (usize, usize) {
        let expired = self.search_cache.cleanup() + self.candidate_cache.cleanup();
        let evicted = self.sessions.evict_idle(self.config.session_idle_ttl).await;
        if expired > 0 || evicted > 0 {
            debug!(expired, evicted, "housekeeping sweep");
        }
        (expired, evicted)
    }
}
