//! Core data models.
//!
//! A [`TrackedDocument`] is a registered URL together with the [`Snapshot`]
//! of its last successfully processed content. Every update cycle appends one
//! immutable [`ChangeRecord`] to the document's history.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fingerprint::document_id;
use crate::snapshot::Snapshot;

/// A registered URL and the state the tracker keeps for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedDocument {
    /// SHA-512 hex of `url`.
    pub id: String,
    pub url: String,
    /// Absent until the first successful fetch.
    pub snapshot: Option<Snapshot>,
    pub created_at: DateTime<Utc>,
}

impl TrackedDocument {
    /// A freshly registered document that has never been fetched.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: document_id(&url),
            url,
            snapshot: None,
            created_at: Utc::now(),
        }
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.snapshot.as_ref().map(|s| s.fingerprint())
    }
}

/// One point of a document's churn time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    /// Store-assigned, increasing per store.
    pub id: i64,
    pub document_id: String,
    pub abs_word_count: u64,
    pub changed_word_count: u64,
    pub created_at: DateTime<Utc>,
}

/// A record that has been computed but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChangeRecord {
    pub document_id: String,
    pub abs_word_count: u64,
    pub changed_word_count: u64,
    pub created_at: DateTime<Utc>,
}

impl NewChangeRecord {
    pub fn new(document_id: impl Into<String>, abs_word_count: u64, changed_word_count: u64) -> Self {
        Self {
            document_id: document_id.into(),
            abs_word_count,
            changed_word_count,
            created_at: Utc::now(),
        }
    }
}
