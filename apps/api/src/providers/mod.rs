//! External collaborators for similarity ranking: embedding generation and the
//! similarity index.
//!
//! `AppState` carries both as `Arc<dyn Embedder>` / `Arc<dyn SimilarityIndex>` so the
//! backends can be swapped at startup without touching callers.

pub mod hashing;
pub mod http;
pub mod index;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("Vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// What kind of entity a vector describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Candidate,
    Job,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Candidate => "candidate",
            EntityKind::Job => "job",
        }
    }
}

/// One similarity hit. Higher scores are more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Turns text into a fixed-length vector. Errors are retryable.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Up to `k` job ids ordered by decreasing similarity. An empty list is a valid answer.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>, ProviderError>;

    /// The vector last stored for `(kind, id)`, if any.
    async fn vector(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<Vec<f32>>, ProviderError>;

    /// Inserts or replaces the vector stored for `(kind, id)`.
    async fn upsert(&self, kind: EntityKind, id: &str, vector: Vec<f32>)
        -> Result<(), ProviderError>;
}
