#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::PageRecord;

/// A bounded span of page text, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// The chunk text
    pub text: String,
    /// Path of the document the chunk was cut from
    pub source_path: String,
    /// Zero-based page the chunk was cut from
    pub page_number: u32,
    /// Position of this chunk within its page
    pub chunk_index: usize,
    /// Unit-length embedding, absent until the chunk has been embedded
    pub vector: Option<Vec<f32>>,
}

/// Configuration for content chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Fraction of `chunk_size` repeated at the start of the following chunk
    pub overlap_fraction: f64,
    /// Cut boundaries, highest priority first. A raw character cut is always the last resort.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 384,
            overlap_fraction: 0.3,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                ". ".to_string(),
                ", ".to_string(),
                " ".to_string(),
            ],
        }
    }
}

impl ChunkingConfig {
    /// Number of characters shared by adjacent chunks
    #[inline]
    pub fn overlap_chars(&self) -> usize {
        (self.chunk_size as f64 * self.overlap_fraction).floor() as usize
    }
}

/// Split every page into overlapping chunks that keep the page's metadata
///
/// Pages are processed independently; a chunk never spans two pages.
#[inline]
pub fn chunk_pages(pages: &[PageRecord], config: &ChunkingConfig) -> Vec<Chunk> {
    let chunks = pages
        .iter()
        .flat_map(|page| {
            split_text(&page.text, config)
                .into_iter()
                .enumerate()
                .map(|(chunk_index, text)| Chunk {
                    text,
                    source_path: page.source_path.clone(),
                    page_number: page.page_number,
                    chunk_index,
                    vector: None,
                })
        })
        .collect::<Vec<_>>();

    debug!(
        "{} pages split into {} chunks (avg {} chars)",
        pages.len(),
        chunks.len(),
        chunks
            .iter()
            .map(|c| c.text.chars().count())
            .sum::<usize>()
            / chunks.len().max(1)
    );

    chunks
}

/// Split a single text into overlapping chunks of at most `chunk_size` characters
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chunk_size = config.chunk_size.max(1);
    let overlap = config.overlap_chars().min(chunk_size - 1);

    // Byte offset of every char plus the end of the text, so char positions can slice `text`
    let offsets = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect::<Vec<_>>();
    let chars = text.chars().collect::<Vec<_>>();
    let char_len = chars.len();

    let mut pieces = Vec::new();
    let mut start = 0;

    while start < char_len {
        if char_len - start <= chunk_size {
            push_trimmed(&mut pieces, &text[offsets[start]..]);
            break;
        }

        let window = &text[offsets[start]..offsets[start + chunk_size]];
        let cut = find_cut(window, overlap, &config.separators).unwrap_or(chunk_size);
        let end = start + cut;
        push_trimmed(&mut pieces, &text[offsets[start]..offsets[end]]);

        start = align_to_word_start(&chars, end - overlap, end);
    }

    pieces
}

/// Find the cut position (in chars) inside `window` for the highest-priority separator
///
/// The cut lands just after the separator and must be past `min_cut` so the
/// next chunk starts after the current one.
fn find_cut(window: &str, min_cut: usize, separators: &[String]) -> Option<usize> {
    separators
        .iter()
        .filter(|sep| !sep.is_empty())
        .find_map(|sep| {
            let (byte_idx, matched) = window.rmatch_indices(sep.as_str()).next()?;
            let cut = window[..byte_idx].chars().count() + matched.chars().count();
            (cut > min_cut).then_some(cut)
        })
}

/// Move `pos` forward to the start of the next word if it sits inside one
///
/// Stays put when no word starts before `limit`, which keeps raw cuts overlapping.
fn align_to_word_start(chars: &[char], pos: usize, limit: usize) -> usize {
    if pos == 0 || pos >= chars.len() || chars[pos - 1].is_whitespace() || chars[pos].is_whitespace() {
        return pos;
    }

    (pos + 1..limit)
        .find(|&i| chars[i - 1].is_whitespace() && !chars[i].is_whitespace())
        .unwrap_or(pos)
}

fn push_trimmed(pieces: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
}
