//! Errors surfaced by an update cycle.
//!
//! Every variant means the cycle produced no record and left the document's
//! stored state untouched; the next scheduled cycle simply tries again.

use thiserror::Error;

use crate::extract::ExtractError;
use crate::fetch::FetchError;
use crate::snapshot::SnapshotError;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("document not found: {0}")]
    UnknownDocument(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Another update of the same document committed first.
    #[error("document {document_id} was updated concurrently (stored fingerprint: {found:?})")]
    Conflict {
        document_id: String,
        found: Option<String>,
    },

    #[error("store operation failed: {0:#}")]
    Store(anyhow::Error),

    #[error("processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl UpdateError {
    /// Short machine-friendly label for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateError::UnknownDocument(_) => "unknown_document",
            UpdateError::Fetch(_) => "fetch",
            UpdateError::Extraction(_) => "extraction",
            UpdateError::Snapshot(_) => "snapshot",
            UpdateError::Conflict { .. } => "conflict",
            UpdateError::Store(_) => "store",
            UpdateError::Task(_) => "task",
        }
    }
}
