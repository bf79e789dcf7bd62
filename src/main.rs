use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdf_rag::Result;
use pdf_rag::commands::{ask, ingest_document, query_collection, show_status};
use pdf_rag::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "pdf-rag")]
#[command(about = "Index a PDF into a local vector store and retrieve the chunks that answer a question")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.pdf-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedder, chunking and vector store
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Load, chunk, embed and store a PDF, replacing the collection's contents
    Ingest {
        /// Path of the PDF to index
        path: PathBuf,
    },
    /// Retrieve the chunks most similar to a question from the indexed PDF
    Query {
        question: String,
        /// Number of chunks to return
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
    /// Ingest a PDF and answer one question in a single run
    Ask {
        path: PathBuf,
        question: String,
        /// Number of chunks to return
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
    /// Show the state of the vector store
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| pdf_rag::RagError::Config(e.to_string()))?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ingest { path } => {
            ingest_document(&Config::load(&config_dir)?, &path).await?;
        }
        Commands::Query { question, top_k } => {
            query_collection(&Config::load(&config_dir)?, &question, top_k).await?;
        }
        Commands::Ask {
            path,
            question,
            top_k,
        } => {
            ask(&Config::load(&config_dir)?, &path, &question, top_k).await?;
        }
        Commands::Status => {
            show_status(&Config::load(&config_dir)?).await?;
        }
    }

    Ok(())
}
