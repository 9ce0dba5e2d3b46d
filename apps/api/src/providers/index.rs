use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::providers::{EntityKind, ProviderError, ScoredId, SimilarityIndex};

/// Cosine similarity rescaled to 0.0..=1.0. Mismatched or zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    ((dot / (norm_a * norm_b)) + 1.0) / 2.0
}

/// Brute-force in-process vector index.
///
/// Stores candidate and job vectors side by side; `search` only ranks job vectors.
pub struct InMemoryIndex {
    dimensions: usize,
    vectors: RwLock<HashMap<(EntityKind, String), Vec<f32>>>,
}

impl InMemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub async fn len(&self, kind: EntityKind) -> usize {
        self.vectors
            .read()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>, ProviderError> {
        if query.len() != self.dimensions {
            return Err(ProviderError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let vectors = self.vectors.read().await;
        let mut hits: Vec<ScoredId> = vectors
            .iter()
            .filter(|((kind, _), _)| *kind == EntityKind::Job)
            .map(|((_, id), vector)| ScoredId {
                id: id.clone(),
                score: cosine_similarity(query, vector),
            })
            .collect();

        // Ties broken by id so the ranking is reproducible.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }

    async fn vector(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<Vec<f32>>, ProviderError> {
        Ok(self.vectors.read().await.get(&(kind, id.to_string())).cloned())
    }

    async fn upsert(
        &self,
        kind: EntityKind,
        id: &str,
        vector: Vec<f32>,
    ) -> Result<(), ProviderError> {
        if vector.len() != self.dimensions {
            return Err(ProviderError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        self.vectors
            .write()
            .await
            .insert((kind, id.to_string()), vector);
        Ok(())
    }
}
