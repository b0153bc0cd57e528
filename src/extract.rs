//! PDF decoding into page-level text.

use std::path::Path;

use thiserror::Error;

/// Errors raised while decoding a PDF.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed to load.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The PDF parser rejected the document.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// The decoding task panicked or was cancelled.
    #[error("PDF extraction task aborted: {0}")]
    Aborted(String),
}

/// Decode PDF bytes into one text entry per page, in page order.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Read and decode a PDF on the blocking pool.
///
/// Parser panics on malformed input surface as [`ExtractError::Aborted`].
pub async fn extract_pages_from_file(path: &Path) -> Result<Vec<String>, ExtractError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ExtractError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let pages = tokio::task::spawn_blocking(move || extract_pages(&bytes))
        .await
        .map_err(|error| ExtractError::Aborted(error.to_string()))??;
    tracing::debug!(path = %path.display(), pages = pages.len(), "Extracted PDF text");
    Ok(pages)
}
