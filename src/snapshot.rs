//! The stored view of a document's last observed content.
//!
//! A [`Snapshot`] pairs the fingerprint of the raw bytes with the zlib
//! compressed normalized text those bytes produced. The two fields are only
//! ever set together, through [`Snapshot::capture`] or [`Snapshot::from_parts`],
//! so a stored fingerprint always describes the stored text.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to compress snapshot: {0}")]
    Compress(#[source] std::io::Error),
    #[error("failed to decompress snapshot: {0}")]
    Decompress(#[source] std::io::Error),
    #[error("snapshot text is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Fingerprint plus compressed normalized text, as one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    fingerprint: String,
    compressed_text: Vec<u8>,
}

impl Snapshot {
    /// Build a snapshot from a fresh fingerprint and its normalized text.
    pub fn capture(fingerprint: String, normalized_text: &str) -> Result<Self, SnapshotError> {
        Ok(Self {
            fingerprint,
            compressed_text: compress(normalized_text)?,
        })
    }

    /// Rehydrate a snapshot read back from storage.
    pub fn from_parts(fingerprint: String, compressed_text: Vec<u8>) -> Self {
        Self {
            fingerprint,
            compressed_text,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn compressed_text(&self) -> &[u8] {
        &self.compressed_text
    }

    /// Decompress the stored normalized text.
    pub fn text(&self) -> Result<String, SnapshotError> {
        decompress(&self.compressed_text)
    }
}

/// Zlib-compress text at the default level.
pub fn compress(text: &str) -> Result<Vec<u8>, SnapshotError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(SnapshotError::Compress)?;
    encoder.finish().map_err(SnapshotError::Compress)
}

/// Inverse of [`compress`].
pub fn decompress(blob: &[u8]) -> Result<String, SnapshotError> {
    let mut decoder = ZlibDecoder::new(blob);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(SnapshotError::Decompress)?;
    Ok(String::from_utf8(out)?)
}
