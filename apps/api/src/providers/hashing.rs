use async_trait::async_trait;
use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

use crate::providers::{Embedder, ProviderError};

// Fixed seeds: changing them changes every vector, so re-warm the index afterwards.
const HASH_SEED_K0: u64 = 0x6a6f_626d_6174_6368;
const HASH_SEED_K1: u64 = 0x0f1e_2d3c_4b5a_6978;

/// Deterministic feature-hashing embedder.
///
/// Needs no model or network access: every lowercase alphanumeric token is hashed into
/// one of `dimensions` buckets with a hashed sign, and the result is L2-normalized.
/// Texts sharing vocabulary land close together, which is enough to rank postings
/// when no remote embedding endpoint is configured.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash(&self, token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
            .map(str::to_lowercase)
        {
            let hashed = self.hash(&token);
            let idx = (hashed % self.dimensions as u64) as usize;
            let sign = if (hashed >> 63) == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_sync(text))
    }

    fn name(&self) -> &'static str {
        "hashing"
    }
}
