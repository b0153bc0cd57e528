//! Word-window chunking and page heading detection.
//!
//! Token budgets are approximated from word counts (`1 token ~ 0.75 words`), so a budget of
//! `max_tokens` keeps `floor(max_tokens * 0.75)` words per chunk. A window of that many words
//! slides over the whitespace-tokenized page, advancing by `words_per_chunk - overlap_words`
//! each step, until a window reaches the end of the page. Every chunk of a page carries the
//! same detected heading and a 0-based index local to that page.

use super::types::{Chunk, ChunkingError, PageText};

/// First lines at or above this many characters are body text, not headings.
pub const HEADING_MAX_CHARS: usize = 100;

/// Word-level window derived from a token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordWindow {
    words_per_chunk: usize,
    overlap_words: usize,
}

impl WordWindow {
    /// Convert token budgets to word counts, failing fast when the window cannot advance.
    pub fn from_tokens(max_tokens: usize, overlap: usize) -> Result<Self, ChunkingError> {
        Self::from_words(max_tokens * 3 / 4, overlap * 3 / 4)
    }

    /// Build a window directly from word counts.
    pub fn from_words(words_per_chunk: usize, overlap_words: usize) -> Result<Self, ChunkingError> {
        if words_per_chunk <= overlap_words {
            return Err(ChunkingError::NonAdvancingWindow {
                words_per_chunk,
                overlap_words,
            });
        }
        Ok(Self {
            words_per_chunk,
            overlap_words,
        })
    }

    /// Words kept per chunk.
    pub fn words_per_chunk(&self) -> usize {
        self.words_per_chunk
    }

    /// Words shared by consecutive chunks.
    pub fn overlap_words(&self) -> usize {
        self.overlap_words
    }

    /// Words the window advances per step; always positive.
    pub fn stride(&self) -> usize {
        self.words_per_chunk - self.overlap_words
    }
}

/// Treat the first line of a page as its heading when it is short enough.
pub fn detect_heading(page_text: &str) -> Option<String> {
    let first = page_text.lines().next()?.trim();
    if first.is_empty() || first.chars().count() >= HEADING_MAX_CHARS {
        return None;
    }
    Some(first.to_string())
}

/// Chunk one page with explicit token budgets.
///
/// Returns an empty vector for pages without words.
pub fn chunk(
    page_text: &str,
    page_number: u32,
    heading: Option<&str>,
    max_tokens: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ChunkingError> {
    let window = WordWindow::from_tokens(max_tokens, overlap)?;
    Ok(chunk_page(page_text, page_number, heading, window))
}

/// Slide `window` over the words of a page.
pub fn chunk_page(
    page_text: &str,
    page_number: u32,
    heading: Option<&str>,
    window: WordWindow,
) -> Vec<Chunk> {
    let words: Vec<&str> = page_text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chunk_index = 0u32;

    while start < words.len() {
        let end = (start + window.words_per_chunk()).min(words.len());
        chunks.push(Chunk::new(
            words[start..end].join(" "),
            page_number,
            chunk_index,
            heading.map(str::to_string),
        ));
        if end == words.len() {
            break;
        }
        chunk_index += 1;
        start += window.stride();
    }

    chunks
}

/// Chunk every page of a document, skipping pages without extractable text.
pub fn chunk_pages(pages: &[PageText], window: WordWindow) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        if page.text.trim().is_empty() {
            tracing::debug!(page = page.page_number, "Skipping page without text");
            continue;
        }
        let heading = detect_heading(&page.text);
        chunks.extend(chunk_page(
            &page.text,
            page.page_number,
            heading.as_deref(),
            window,
        ));
    }
    chunks
}
