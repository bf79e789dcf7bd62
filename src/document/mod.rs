// Document loading
// Turns a PDF file into ordered page-level text records

#[cfg(test)]
pub(crate) mod tests;

use std::path::Path;

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::{RagError, Result};

/// Text of a single physical page, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Extracted page text (may be empty)
    pub text: String,
    /// Path of the source document as given by the caller
    pub source_path: String,
    /// Zero-based page number
    pub page_number: u32,
}

/// Source of page records for the ingest pipeline
pub trait DocumentLoader: Send + Sync {
    /// Load every page of the document at `path`, in page order
    fn load(&self, path: &Path) -> Result<Vec<PageRecord>>;
}

/// Loader for PDF documents
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    #[inline]
    fn load(&self, path: &Path) -> Result<Vec<PageRecord>> {
        load_pdf(path)
    }
}

/// Load a PDF into one `PageRecord` per page
///
/// Fails with `FileNotFound` when nothing exists at `path` and with `Parse`
/// when the file cannot be opened as a PDF. A single page whose text cannot be
/// decoded produces an empty record instead of failing the whole document.
#[inline]
pub fn load_pdf(path: &Path) -> Result<Vec<PageRecord>> {
    if !path.exists() {
        return Err(RagError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    debug!("Opening PDF document at {}", path.display());

    let document = Document::load(path).map_err(|e| RagError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let source_path = path.to_string_lossy().into_owned();

    // get_pages is keyed by the 1-based page number, so iteration is already in page order
    let pages = document
        .get_pages()
        .into_keys()
        .map(|number| {
            let text = document.extract_text(&[number]).unwrap_or_else(|e| {
                warn!(
                    "Could not extract text from page {} of {}: {}",
                    number,
                    path.display(),
                    e
                );
                String::new()
            });

            PageRecord {
                text,
                source_path: source_path.clone(),
                page_number: number.saturating_sub(1),
            }
        })
        .collect::<Vec<_>>();

    info!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}
