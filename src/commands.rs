use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::Config;
use crate::database::{LanceVectorStore, VectorStore};
use crate::embeddings::{Embedder, create_embedder};
use crate::pipeline::{IngestHandle, QueryResult, RetrievalPipeline};

type CliPipeline = RetrievalPipeline<Box<dyn Embedder>, LanceVectorStore>;

/// Connect the configured embedder and vector store
async fn build_pipeline(config: &Config) -> Result<CliPipeline> {
    let embedder = create_embedder(config).context("Failed to initialize embedder")?;
    let store = LanceVectorStore::new(config)
        .await
        .context("Failed to open vector store")?;

    Ok(RetrievalPipeline::new(
        embedder,
        store,
        config.chunking.clone(),
        config.store.collection.clone(),
    ))
}

fn embed_progress_bar() -> ProgressBar {
    if console::user_attended_stderr() {
        ProgressBar::new(0).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding chunks {wide_bar}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
    } else {
        ProgressBar::hidden()
    }
}

async fn run_ingest(pipeline: CliPipeline, path: &Path) -> Result<(CliPipeline, IngestHandle)> {
    let bar = embed_progress_bar();
    let bar_for_pipeline = bar.clone();
    let pipeline = pipeline.with_embed_progress(Box::new(move |done, total| {
        bar_for_pipeline.set_length(total as u64);
        bar_for_pipeline.set_position(done as u64);
    }));

    let result = pipeline.ingest(path).await;
    bar.finish_and_clear();

    let handle = result.with_context(|| format!("Failed to ingest {}", path.display()))?;
    Ok((pipeline, handle))
}

fn print_ingest_summary(handle: &IngestHandle) {
    println!(
        "{} {}",
        style("Ingested").green().bold(),
        handle.source.display()
    );
    println!("  Collection: {}", handle.collection);
    println!(
        "  Pages: {} ({} without text)",
        handle.stats.pages, handle.stats.empty_pages
    );
    println!("  Chunks: {}", handle.stats.chunks);
    println!("  Records: {}", handle.stats.records);
    println!(
        "  Model: {} ({} dimensions)",
        handle.model_id, handle.dimension
    );
    println!("  Duration: {:.2?}", handle.stats.total_duration);
}

fn print_results(question: &str, results: &[QueryResult]) {
    println!("{} {}", style("Question:").bold().cyan(), question);

    if results.is_empty() {
        println!("No matching chunks found.");
        return;
    }

    for (rank, result) in results.iter().enumerate() {
        println!();
        println!(
            "{} score {:.4}  {} (page {})",
            style(format!("#{}", rank + 1)).bold().yellow(),
            result.score,
            result.source,
            result.page
        );
        println!("   {}", result.chunk.split_whitespace().collect::<Vec<_>>().join(" "));
    }
}

/// Ingest a PDF into the configured collection, replacing its previous contents
#[inline]
pub async fn ingest_document(config: &Config, path: &Path) -> Result<IngestHandle> {
    let pipeline = build_pipeline(config).await?;
    let (_, handle) = run_ingest(pipeline, path).await?;

    print_ingest_summary(&handle);
    Ok(handle)
}

/// Ask a question against a previously ingested collection
#[inline]
pub async fn query_collection(
    config: &Config,
    question: &str,
    top_k: Option<usize>,
) -> Result<Vec<QueryResult>> {
    let top_k = top_k.unwrap_or(config.query.top_k);
    let pipeline = build_pipeline(config).await?;

    let results = pipeline
        .query_collection(&config.store.collection, question, top_k)
        .await
        .context("Query failed")?;

    print_results(question, &results);
    Ok(results)
}

/// Ingest a document and answer one question in the same session
#[inline]
pub async fn ask(
    config: &Config,
    path: &Path,
    question: &str,
    top_k: Option<usize>,
) -> Result<Vec<QueryResult>> {
    let top_k = top_k.unwrap_or(config.query.top_k);
    let pipeline = build_pipeline(config).await?;
    let (pipeline, handle) = run_ingest(pipeline, path).await?;
    print_ingest_summary(&handle);
    println!();

    let results = pipeline
        .query(&handle, question, top_k)
        .await
        .context("Query failed")?;

    print_results(question, &results);
    Ok(results)
}

/// Show the state of the configured collection
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    let store = LanceVectorStore::new(config)
        .await
        .context("Failed to open vector store")?;
    let collection = &config.store.collection;

    println!("{}", style("📊 Vector Store Status").bold().cyan());
    println!("  Path: {}", store.path().display());
    println!("  Consistency: {:?}", store.consistency());
    println!("  Collection: {}", collection);

    if !store.has_collection(collection).await? {
        println!("  State: {}", style("not created").yellow());
        println!("Use 'pdf-rag ingest <path>' to index a document.");
        return Ok(());
    }

    let count = store.count(collection).await?;
    let dimension = store.dimension(collection).await?;
    info!("Collection '{}' holds {} records", collection, count);

    println!("  Records: {}", count);
    println!("  Dimension: {}", dimension);
    Ok(())
}
