//! TextExtractor: turns a PDF resume into one plain-text string.
//!
//! Pages are read with `pdf-extract` on the blocking pool and joined in page
//! order with `\n`. A failed extraction never yields partial text.

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{ExtractedText, ResumeDocument};

/// PDF readers accept the header anywhere in the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is empty")]
    Empty,

    #[error("unsupported document format (no PDF header)")]
    Unsupported,

    #[error("malformed PDF: {0}")]
    Malformed(String),

    #[error("document has no extractable text")]
    NoText,

    #[error("extraction aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl TextExtractor {
    pub async fn extract(&self, document: &ResumeDocument) -> Result<ExtractedText, ExtractError> {
        if document.bytes.is_empty() {
            return Err(ExtractError::Empty);
        }
        if !has_pdf_header(&document.bytes) {
            return Err(ExtractError::Unsupported);
        }

        // Bytes clones are reference-counted, not copies.
        let bytes = document.bytes.clone();
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        // pdf-extract panics on some damaged inputs; the join error carries it.
        .map_err(|e| ExtractError::Aborted(e.to_string()))?
        .map_err(|e| ExtractError::Malformed(e.to_string()))?;

        let extracted = join_pages(pages)?;
        info!(
            pages = extracted.pages,
            chars = extracted.len(),
            "text extracted"
        );
        Ok(extracted)
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

fn join_pages(pages: Vec<String>) -> Result<ExtractedText, ExtractError> {
    debug!(pages = pages.len(), "joining page text");
    let extracted = ExtractedText {
        pages: pages.len(),
        text: pages.join("\n"),
    };
    if extracted.is_empty() {
        return Err(ExtractError::NoText);
    }
    Ok(extracted)
}
