use crate::error::ChatError;
use anyhow::{anyhow, Context, Result};
use std::panic::{self, AssertUnwindSafe};

/// Page-ordered text pulled out of a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub pages: Vec<String>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Each page's text followed by a newline, in page order.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for page in &self.pages {
            text.push_str(page);
            text.push('\n');
        }
        text
    }
}

pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument, ChatError>;
}

/// Rejects uploads over `limit` bytes before any parsing happens.
pub fn validate_upload(size: usize, limit: usize) -> Result<(), ChatError> {
    if size > limit {
        return Err(ChatError::OversizeUpload { size, limit });
    }
    Ok(())
}

pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        if !bytes.starts_with(b"%PDF-") {
            return Err(anyhow!("missing %PDF header"));
        }

        // pdf-extract panics on some malformed inputs instead of returning an error.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        match outcome {
            Ok(pages) => pages.context("failed to parse PDF"),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(anyhow!("PDF parser aborted: {}", reason))
            }
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedDocument, ChatError> {
        log::info!("Extracting text from PDF ({} bytes)", bytes.len());

        let pages = self.extract_pages(bytes).map_err(ChatError::extraction)?;

        log::info!("Extracted {} pages", pages.len());
        Ok(ExtractedDocument { pages })
    }
}
