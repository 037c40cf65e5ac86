//! Content type detection by signature sniffing.
//!
//! Fetched bytes carry no trustworthy file extension, so classification looks
//! at the leading bytes only. Anything that is not recognised as a paginated
//! document is treated as plain text: extraction must always produce some
//! text.

use std::fmt;

/// Signature that opens every PDF file (`%PDF-1.x`).
const PDF_MAGIC: &[u8] = b"%PDF-";

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Classification tag produced by [`detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Bytes are decoded and used as text directly.
    PlainText,
    /// A paginated document (PDF) that needs layout-aware text extraction.
    StructuredDocument,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::PlainText => "plain_text",
            ContentKind::StructuredDocument => "structured_document",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify raw content by inspecting its signature.
pub fn detect(bytes: &[u8]) -> ContentKind {
    if looks_like_pdf(bytes) {
        ContentKind::StructuredDocument
    } else {
        ContentKind::PlainText
    }
}

/// The signature must open the content. Only a UTF-8 BOM and ASCII
/// whitespace, which some servers prepend, may come before it.
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let rest = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = rest
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    rest[start..].starts_with(PDF_MAGIC)
}
