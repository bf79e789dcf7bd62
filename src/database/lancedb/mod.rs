// LanceDB vector database module
// Handles vector storage and similarity search for embedded chunks


pub mod vector_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Read consistency of a collection handle
///
/// `Strong` reads always observe the latest commit. `Eventually` reads may lag
/// behind writes by up to the configured refresh interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Strong,
    #[default]
    Eventually,
}

/// A chunk ready to be written, the store assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub chunk: String,
    pub source: String,
    pub page: u32,
    pub chunk_index: u32,
    pub vector: Vec<f32>,
}

/// Persisted form of a chunk
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub id: i64,
    pub chunk: String,
    pub source: String,
    pub page: u32,
    pub chunk_index: u32,
    pub vector: Vec<f32>,
}

impl NewRecord {
    #[inline]
    pub fn with_id(self, id: i64) -> IndexedRecord {
        IndexedRecord {
            id,
            chunk: self.chunk,
            source: self.source,
            page: self.page,
            chunk_index: self.chunk_index,
            vector: self.vector,
        }
    }
}

/// Non-vector attributes a search can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputField {
    Chunk,
    Source,
    Page,
    ChunkIndex,
}

impl OutputField {
    pub const ALL: [Self; 4] = [Self::Chunk, Self::Source, Self::Page, Self::ChunkIndex];

    /// Column name in the collection schema
    #[inline]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::Source => "source",
            Self::Page => "page",
            Self::ChunkIndex => "chunk_index",
        }
    }
}

/// One nearest-neighbor match
///
/// Fields that were not requested through [`OutputField`] are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: i64,
    pub chunk: Option<String>,
    pub source: Option<String>,
    pub page: Option<u32>,
    pub chunk_index: Option<u32>,
    /// Cosine distance, 0 for identical directions
    pub distance: f32,
    /// Cosine similarity, `1 - distance`
    pub score: f32,
}

/// Named collections of embedded chunks with nearest-neighbor search
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create an empty collection, replacing any existing one when `overwrite` is set
    ///
    /// Without `overwrite` an existing collection is kept as long as its
    /// dimension matches.
    async fn create_collection(&self, name: &str, dimension: usize, overwrite: bool)
    -> Result<()>;

    /// Insert records atomically and return the ids assigned to them, in input order
    async fn insert(&self, name: &str, records: Vec<NewRecord>) -> Result<Vec<i64>>;

    /// Return at most `top_k` records ordered best-first
    async fn search(
        &self,
        name: &str,
        query: &[f32],
        top_k: usize,
        output_fields: &[OutputField],
    ) -> Result<Vec<SearchHit>>;

    async fn drop_collection(&self, name: &str) -> Result<()>;

    async fn has_collection(&self, name: &str) -> Result<bool>;

    async fn count(&self, name: &str) -> Result<usize>;

    /// Vector dimension the collection was created with
    async fn dimension(&self, name: &str) -> Result<usize>;
}
