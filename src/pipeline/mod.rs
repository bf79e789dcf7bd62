// Retrieval pipeline
// ingest: load -> chunk -> embed -> store, query: embed -> search -> ranked results


use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::database::lancedb::{NewRecord, OutputField, SearchHit, VectorStore};
use crate::document::{DocumentLoader, PdfLoader};
use crate::embeddings::chunking::{Chunk, ChunkingConfig, chunk_pages};
use crate::embeddings::Embedder;
use crate::{RagError, Result};

/// Number of chunk texts handed to the embedder per progress update
const EMBED_GROUP_SIZE: usize = 64;

const PREVIEW_CHARS: usize = 100;

/// Called with `(embedded, total)` after every embedded group of chunks
pub type EmbedProgress = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Counters describing one ingest run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    pub pages: usize,
    pub empty_pages: usize,
    pub chunks: usize,
    pub records: usize,
    pub embed_duration: Duration,
    pub total_duration: Duration,
}

/// Where an ingested chunk lives, without its text or vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub id: i64,
    pub source: String,
    pub page: u32,
    pub chunk_index: u32,
    pub chars: usize,
}

/// Result of a successful ingest, passed back into [`RetrievalPipeline::query`]
#[derive(Debug, Clone)]
pub struct IngestHandle {
    pub collection: String,
    pub source: PathBuf,
    pub dimension: usize,
    pub model_id: String,
    pub stats: IngestStats,
    pub chunks: Vec<ChunkMetadata>,
}

/// A retrieved chunk, best matches first
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub chunk: String,
    pub source: String,
    pub page: u32,
    pub score: f32,
}

/// Owns the embedder, store and loader for one session
pub struct RetrievalPipeline<E, S, L = PdfLoader> {
    embedder: E,
    store: S,
    loader: L,
    chunking: ChunkingConfig,
    collection: String,
    progress: Option<EmbedProgress>,
}

impl<E: Embedder, S: VectorStore> RetrievalPipeline<E, S, PdfLoader> {
    /// Pipeline reading PDFs from disk
    #[inline]
    pub fn new(embedder: E, store: S, chunking: ChunkingConfig, collection: impl Into<String>) -> Self {
        Self::with_loader(embedder, store, PdfLoader, chunking, collection)
    }
}

impl<E: Embedder, S: VectorStore, L: DocumentLoader> RetrievalPipeline<E, S, L> {
    #[inline]
    pub fn with_loader(
        embedder: E,
        store: S,
        loader: L,
        chunking: ChunkingConfig,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            loader,
            chunking,
            collection: collection.into(),
            progress: None,
        }
    }

    /// Report embedding progress to `progress`
    #[inline]
    #[must_use]
    pub fn with_embed_progress(mut self, progress: EmbedProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    #[inline]
    pub const fn embedder(&self) -> &E {
        &self.embedder
    }

    #[inline]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Load, chunk, embed and store the document at `path`
    ///
    /// The collection is recreated from scratch, so any previous contents are
    /// dropped. Nothing touches the store until the document has been loaded,
    /// chunked and embedded without error.
    #[inline]
    pub async fn ingest(&self, path: &Path) -> Result<IngestHandle> {
        let started = Instant::now();
        info!("Ingesting {} into '{}'", path.display(), self.collection);

        let pages = self.loader.load(path)?;
        let empty_pages = pages.iter().filter(|p| p.text.trim().is_empty()).count();
        debug!(
            "Loaded {} pages ({} without text)",
            pages.len(),
            empty_pages
        );

        let mut chunks = chunk_pages(&pages, &self.chunking);
        if chunks.is_empty() {
            return Err(RagError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        info!("Split {} pages into {} chunks", pages.len(), chunks.len());

        let embed_started = Instant::now();
        self.embed_chunks(&mut chunks)?;
        let embed_duration = embed_started.elapsed();
        info!(
            "Embedded {} chunks with '{}' in {:.2}s",
            chunks.len(),
            self.embedder.model_id(),
            embed_duration.as_secs_f64()
        );

        let dimension = self.embedder.dimension();
        self.store
            .create_collection(&self.collection, dimension, true)
            .await?;

        let records = chunks
            .iter()
            .map(to_record)
            .collect::<Result<Vec<_>>>()?;
        let ids = self.store.insert(&self.collection, records).await?;

        let metadata = chunks
            .iter()
            .zip(&ids)
            .map(|(chunk, &id)| ChunkMetadata {
                id,
                source: chunk.source_path.clone(),
                page: chunk.page_number,
                chunk_index: u32::try_from(chunk.chunk_index).unwrap_or(u32::MAX),
                chars: chunk.text.chars().count(),
            })
            .collect::<Vec<_>>();

        let stats = IngestStats {
            pages: pages.len(),
            empty_pages,
            chunks: chunks.len(),
            records: ids.len(),
            embed_duration,
            total_duration: started.elapsed(),
        };

        info!(
            "Ingested {} records from {} in {:.2}s",
            stats.records,
            path.display(),
            stats.total_duration.as_secs_f64()
        );

        Ok(IngestHandle {
            collection: self.collection.clone(),
            source: path.to_path_buf(),
            dimension,
            model_id: self.embedder.model_id().to_string(),
            stats,
            chunks: metadata,
        })
    }

    /// Answer `question` with the `top_k` closest chunks of an ingested document
    #[inline]
    pub async fn query(
        &self,
        handle: &IngestHandle,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<QueryResult>> {
        self.query_collection(&handle.collection, question, top_k)
            .await
    }

    /// Query a collection by name, e.g. one ingested in an earlier session
    #[inline]
    pub async fn query_collection(
        &self,
        collection: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<QueryResult>> {
        if question.trim().is_empty() {
            return Err(RagError::Query {
                collection: collection.to_string(),
                message: "question is empty".to_string(),
            });
        }
        if top_k == 0 {
            return Err(RagError::Query {
                collection: collection.to_string(),
                message: "top_k must be at least 1".to_string(),
            });
        }

        debug!("Querying '{}' for {:?} (top {})", collection, question, top_k);

        let vector = self.embedder.embed_one(question)?;
        let hits = self
            .store
            .search(
                collection,
                &vector,
                top_k,
                &[OutputField::Chunk, OutputField::Source, OutputField::Page],
            )
            .await?;

        let results = hits.into_iter().map(to_result).collect::<Vec<_>>();

        info!("Query returned {} results from '{}'", results.len(), collection);
        for (rank, result) in results.iter().take(2).enumerate() {
            debug!(
                "#{} score {:.4} page {}: {}",
                rank + 1,
                result.score,
                result.page,
                preview(&result.chunk)
            );
        }

        Ok(results)
    }

    fn embed_chunks(&self, chunks: &mut [Chunk]) -> Result<()> {
        let total = chunks.len();
        let mut embedded = 0;

        for group in chunks.chunks_mut(EMBED_GROUP_SIZE) {
            let texts = group.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
            let vectors = self.embedder.embed(&texts)?;

            if vectors.len() != group.len() {
                return Err(RagError::Model(format!(
                    "Embedder returned {} vectors for {} texts",
                    vectors.len(),
                    group.len()
                )));
            }

            for (chunk, vector) in group.iter_mut().zip(vectors) {
                chunk.vector = Some(vector);
            }

            embedded += group.len();
            if let Some(progress) = &self.progress {
                progress(embedded, total);
            }
        }

        Ok(())
    }
}

fn to_record(chunk: &Chunk) -> Result<NewRecord> {
    let vector = chunk.vector.clone().ok_or_else(|| {
        RagError::Model(format!(
            "Chunk {} of page {} was not embedded",
            chunk.chunk_index, chunk.page_number
        ))
    })?;

    Ok(NewRecord {
        chunk: chunk.text.clone(),
        source: chunk.source_path.clone(),
        page: chunk.page_number,
        chunk_index: u32::try_from(chunk.chunk_index).unwrap_or(u32::MAX),
        vector,
    })
}

fn to_result(hit: SearchHit) -> QueryResult {
    QueryResult {
        chunk: hit.chunk.unwrap_or_default(),
        source: hit.source.unwrap_or_default(),
        page: hit.page.unwrap_or_default(),
        score: hit.score,
    }
}

/// First characters of a chunk on a single line
fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut preview = flat.chars().take(PREVIEW_CHARS).collect::<String>();
    if flat.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
