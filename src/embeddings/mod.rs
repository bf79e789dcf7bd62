// Embeddings module
// Text chunking plus the embedding backends that turn chunks into unit vectors

pub mod chunking;
pub mod hashing;
pub mod ollama;


use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::{RagError, Result};

pub use chunking::{Chunk, ChunkingConfig, chunk_pages, split_text};
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;

/// Norms below this are treated as zero vectors that cannot be normalized
const MIN_NORM: f32 = 1e-12;

/// Maps text to fixed-dimension, L2-normalized vectors
///
/// Implementations must return exactly one vector per input text, in input
/// order, each with `dimension()` components and unit length.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    ///
    /// Routed through `embed` so a single call and a batch call produce the same vector.
    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .pop()
            .ok_or_else(|| RagError::Model("Embedder returned no vector".to_string()))
    }

    /// Output dimension, fixed once the model is loaded
    fn dimension(&self) -> usize;

    /// Longest input (in model tokens) the model encodes without truncation
    fn max_sequence_length(&self) -> usize;

    /// Identifier of the underlying model
    fn model_id(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }

    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_one(text)
    }

    #[inline]
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    #[inline]
    fn max_sequence_length(&self) -> usize {
        (**self).max_sequence_length()
    }

    #[inline]
    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Where the model runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Force CPU inference
    Cpu,
    /// Use a GPU when the backend has one
    #[default]
    Auto,
}

/// Which embedding backend to construct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Ollama,
    Hashing,
}

/// Scale `vector` to unit length in place
///
/// Fails on zero (or non-finite) vectors since they have no direction.
#[inline]
pub fn normalize_l2(vector: &mut [f32]) -> Result<()> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm < MIN_NORM {
        return Err(RagError::Model(format!(
            "Cannot normalize embedding with norm {}",
            norm
        )));
    }

    for value in vector.iter_mut() {
        *value /= norm;
    }
    Ok(())
}

/// Build the embedder selected in the configuration
#[inline]
pub fn create_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    match config.embedding.provider {
        EmbeddingProvider::Ollama => Ok(Box::new(OllamaEmbedder::new(&config.embedding)?)),
        EmbeddingProvider::Hashing => Ok(Box::new(HashingEmbedder::new(
            config.embedding.hashing_dimension,
        ))),
    }
}
