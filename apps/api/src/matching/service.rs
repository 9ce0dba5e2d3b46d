//! Match Service: the `search` operation behind the chat tool and the matches endpoint.
//!
//! Loads the authoritative profile, serves repeated queries from the TTL cache, asks the
//! similarity collaborators for a ranking and runs the matcher. Any similarity failure
//! degrades to unranked filtering over the whole pool.
//!
//! Without extra criteria the ranking query is the candidate vector kept fresh by the
//! refresh queue. The profile is embedded inline only when no stored vector exists yet.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::errors::AppError;
use crate::matching::matcher::{match_jobs, MatchResult, RankedJob};
use crate::models::candidate::CandidateProfile;
use crate::providers::{Embedder, EntityKind, ProviderError, ScoredId, SimilarityIndex};
use crate::store::jobs::JobPool;
use crate::store::profiles::ProfileStore;

/// Neighbours requested per wanted result, leaving room for filtered-out jobs.
const OVERFETCH: usize = 5;

/// Upper bound on results per search, whoever asks.
pub const MAX_MATCHES: usize = 50;

pub struct MatchService {
    profiles: Arc<ProfileStore>,
    jobs: Arc<JobPool>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    cache: Arc<TtlCache<MatchResult>>,
    cache_ttl: Duration,
}

impl MatchService {
    pub fn new(
        profiles: Arc<ProfileStore>,
        jobs: Arc<JobPool>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
        cache: Arc<TtlCache<MatchResult>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            profiles,
            jobs,
            embedder,
            index,
            cache,
            cache_ttl,
        }
    }

    pub async fn search(
        &self,
        candidate_id: &str,
        additional_criteria: Option<&str>,
        limit: usize,
    ) -> Result<MatchResult, AppError> {
        let limit = limit.min(MAX_MATCHES);
        let profile = self.profiles.get(candidate_id).await?;
        let criteria = additional_criteria
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let key = format!(
            "search:{}:{}:{}:{}",
            profile.id,
            profile.match_fingerprint(),
            criteria.unwrap_or(""),
            limit
        );
        if let Some(cached) = self.cache.get(&key) {
            debug!(candidate_id, "search served from cache");
            return Ok(cached);
        }

        let k = limit
            .saturating_add(profile.declined_job_ids.len())
            .max(1)
            .saturating_mul(OVERFETCH);
        let ranking = match self.rank(&profile, criteria, k).await {
            Ok(ranking) => Some(ranking),
            Err(e) => {
                warn!(candidate_id, "similarity ranking unavailable, using keyword order: {e}");
                None
            }
        };

        let result = match_jobs(&profile, self.jobs.all(), ranking.as_deref(), limit);
        self.cache.set(key, result.clone(), self.cache_ttl);
        Ok(result)
    }

    /// Free-text similarity search over the pool, without any candidate filters.
    pub async fn search_text(&self, query: &str, limit: usize) -> Result<Vec<RankedJob>, AppError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| AppError::SearchUnavailable(e.to_string()))?;
        let hits = self
            .index
            .search(&vector, limit)
            .await
            .map_err(|e| AppError::SearchUnavailable(e.to_string()))?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.jobs.get(&hit.id).map(|job| RankedJob {
                    job: job.clone(),
                    score: hit.score,
                })
            })
            .collect())
    }

    async fn rank(
        &self,
        profile: &CandidateProfile,
        criteria: Option<&str>,
        k: usize,
    ) -> Result<Vec<ScoredId>, ProviderError> {
        let vector = match criteria {
            None => match self.index.vector(EntityKind::Candidate, &profile.id).await? {
                Some(stored) => stored,
                None => self.embedder.embed(&profile.to_embedding_text()).await?,
            },
            Some(criteria) => {
                let text = format!(
                    "{}\nAdditional criteria: {criteria}",
                    profile.to_embedding_text()
                );
                self.embedder.embed(&text).await?
            }
        };
        self.index.search(&vector, k).await
    }
}
