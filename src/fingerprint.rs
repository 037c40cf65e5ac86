//! SHA-512 fingerprints for raw content and document identity.
//!
//! A fingerprint only decides whether the expensive extract + diff path can
//! be skipped. Word counts are always computed from text, never inferred from
//! a hash.

use sha2::{Digest, Sha512};

/// Length of a hex-encoded SHA-512 digest.
pub const FINGERPRINT_HEX_LEN: usize = 128;

/// Hex-encoded SHA-512 of the exact raw bytes, before any extraction.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Stable document identity derived from its source URL.
pub fn document_id(url: &str) -> String {
    fingerprint(url.as_bytes())
}
