//! Offline embedder based on feature hashing.
//!
//! Each lower-cased alphanumeric token is hashed with xxHash64 into one of
//! `dimension` buckets with a hash-derived sign, and the bag is L2-normalized.
//! Texts sharing words get a positive cosine similarity, which is enough for
//! local runs and tests without a model server.

#[cfg(test)]
mod tests;

use std::hash::Hasher;

use tracing::debug;
use twox_hash::XxHash64;

use super::{Embedder, normalize_l2};
use crate::Result;

const HASH_SEED: u64 = 0;
const MODEL_ID: &str = "feature-hashing";

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dimension];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(HASH_SEED);
            hasher.write(token.as_bytes());
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        // No tokens: fall back to a fixed unit vector
        if vector.iter().all(|v| *v == 0.0) {
            vector[0] = 1.0;
        }

        normalize_l2(&mut vector)?;
        Ok(vector)
    }
}

impl Embedder for HashingEmbedder {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Hashing {} texts into {} dimensions", texts.len(), self.dimension);
        texts.iter().map(|text| self.embed_text(text)).collect()
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn max_sequence_length(&self) -> usize {
        usize::MAX
    }

    #[inline]
    fn model_id(&self) -> &str {
        MODEL_ID
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}
