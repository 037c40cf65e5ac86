//! Storage abstraction for tracked documents and their change history.
//!
//! The [`Store`] trait is everything the tracker needs from persistence.
//! Backends: [`memory::InMemoryStore`] for tests and embedding, and
//! [`sqlite::SqliteStore`] for the CLI.
//!
//! Implementations must be `Send + Sync`: updates for different documents run
//! concurrently against one shared store.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ChangeRecord, NewChangeRecord, TrackedDocument};
use crate::snapshot::Snapshot;

/// Outcome of [`Store::commit_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Snapshot (if any) replaced and record appended, as one unit.
    Applied(ChangeRecord),
    /// The stored fingerprint no longer matched the expected one; nothing
    /// was written.
    Conflict { found: Option<String> },
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_document`](Store::get_document) | Look up a document by id |
/// | [`put_document`](Store::put_document) | Register a document (insert-if-absent) |
/// | [`list_documents`](Store::list_documents) | All tracked documents |
/// | [`append_change_record`](Store::append_change_record) | Append a record without touching the snapshot |
/// | [`get_latest_change_record`](Store::get_latest_change_record) | Most recent record of a document |
/// | [`list_change_records`](Store::list_change_records) | A document's full time series |
/// | [`commit_update`](Store::commit_update) | Atomic compare-and-set of snapshot plus record append |
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_document(&self, id: &str) -> Result<Option<TrackedDocument>>;

    /// Insert `doc` unless a document with the same id exists.
    ///
    /// Returns `true` when the document was inserted. An existing document,
    /// and in particular its snapshot, is never overwritten here; snapshots
    /// only change through [`commit_update`](Store::commit_update).
    async fn put_document(&self, doc: &TrackedDocument) -> Result<bool>;

    /// All documents, oldest registration first.
    async fn list_documents(&self) -> Result<Vec<TrackedDocument>>;

    async fn append_change_record(&self, record: &NewChangeRecord) -> Result<ChangeRecord>;

    async fn get_latest_change_record(&self, document_id: &str) -> Result<Option<ChangeRecord>>;

    /// Records of one document in creation order.
    async fn list_change_records(&self, document_id: &str) -> Result<Vec<ChangeRecord>>;

    /// In one transaction: check that the document's stored fingerprint equals
    /// `expected_fingerprint`, replace its snapshot with `snapshot` when given,
    /// and append `record`.
    ///
    /// Record timestamps never go backwards within a document: a record
    /// created earlier than the document's latest one is stamped with the
    /// latest timestamp instead.
    async fn commit_update(
        &self,
        document_id: &str,
        expected_fingerprint: Option<&str>,
        snapshot: Option<&Snapshot>,
        record: &NewChangeRecord,
    ) -> Result<Commit>;
}
