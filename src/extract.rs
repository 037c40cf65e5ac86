//! Text extraction from fetched content.
//!
//! Extraction sits behind the [`TextExtractor`] capability so the pipeline
//! never touches a parsing library's object model directly. [`extract_text`]
//! sniffs the bytes with [`detect`](crate::detect::detect) and dispatches to
//! the matching extractor.

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::detect::{detect, ContentKind};

/// Extraction failure. Only raised when a document is unreadable as a whole;
/// unextractable pieces (images, locked objects) are skipped silently.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Produces plain text from raw content of one kind.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Decodes bytes as UTF-8 and returns them unchanged.
///
/// Invalid sequences become U+FFFD rather than failing, so any byte stream
/// still yields text.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Layout-aware text reconstruction for PDF documents via `pdf-extract`.
///
/// Pages are processed in document order and their text runs concatenated.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        // pdf-extract panics on some malformed inputs instead of returning Err.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));
        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
            Err(payload) => Err(ExtractError::Pdf(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("parser panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("parser panicked: {}", s)
    } else {
        "parser panicked".to_string()
    }
}

/// Returns the extractor responsible for a content kind.
pub fn extractor_for(kind: ContentKind) -> &'static dyn TextExtractor {
    match kind {
        ContentKind::PlainText => &PlainTextExtractor,
        ContentKind::StructuredDocument => &PdfExtractor,
    }
}

/// Detects the content kind and extracts its text.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let kind = detect(bytes);
    tracing::debug!(kind = %kind, bytes = bytes.len(), "extracting text");
    extractor_for(kind).extract(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through_verbatim() {
        let raw = "  this is plain text\n with ünïcödé;\tand punctuation!  ";
        assert_eq!(extract_text(raw.as_bytes()).unwrap(), raw);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let text = extract_text(b"abc \xff def").unwrap();
        assert_eq!(text, "abc \u{fffd} def");
    }

    #[test]
    fn unreadable_pdf_returns_error() {
        let err = extract_text(b"%PDF-1.4\nthis is not really a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn dispatch_follows_content_kind() {
        let plain = extractor_for(ContentKind::PlainText);
        assert_eq!(plain.extract(b"%PDF-").unwrap(), "%PDF-");
        let pdf = extractor_for(ContentKind::StructuredDocument);
        assert!(pdf.extract(b"not a pdf").is_err());
    }
}
