use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("File not found: {}. Please provide a valid file path.", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Embedding model error: {0}")]
    Model(String),

    #[error(
        "Dimension mismatch for collection '{collection}': expected {expected}, got {actual}"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Vector store connection error: {0}")]
    Connection(String),

    #[error("No chunks produced from {}: the document contains no text", path.display())]
    EmptyInput { path: PathBuf },

    #[error("Query against collection '{collection}' failed: {message}")]
    Query { collection: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod pipeline;
