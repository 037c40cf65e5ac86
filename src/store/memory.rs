//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Documents and records live behind a single `RwLock`, so a commit observes
//! and mutates both under one write guard.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{ChangeRecord, NewChangeRecord, TrackedDocument};
use crate::snapshot::Snapshot;

use super::{Commit, Store};

#[derive(Default)]
struct Inner {
    docs: HashMap<String, TrackedDocument>,
    records: Vec<ChangeRecord>,
    next_record_id: i64,
}

impl Inner {
    fn push_record(&mut self, record: &NewChangeRecord) -> ChangeRecord {
        let floor = self
            .records
            .iter()
            .rev()
            .find(|r| r.document_id == record.document_id)
            .map(|r| r.created_at);
        self.next_record_id += 1;
        let stored = ChangeRecord {
            id: self.next_record_id,
            document_id: record.document_id.clone(),
            abs_word_count: record.abs_word_count,
            changed_word_count: record.changed_word_count,
            created_at: floor.map_or(record.created_at, |f| f.max(record.created_at)),
        };
        self.records.push(stored.clone());
        stored
    }
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_document(&self, id: &str) -> Result<Option<TrackedDocument>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.docs.get(id).cloned())
    }

    async fn put_document(&self, doc: &TrackedDocument) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        if inner.docs.contains_key(&doc.id) {
            return Ok(false);
        }
        inner.docs.insert(doc.id.clone(), doc.clone());
        Ok(true)
    }

    async fn list_documents(&self) -> Result<Vec<TrackedDocument>> {
        let inner = self.inner.read().unwrap();
        let mut docs: Vec<TrackedDocument> = inner.docs.values().cloned().collect();
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    async fn append_change_record(&self, record: &NewChangeRecord) -> Result<ChangeRecord> {
        let mut inner = self.inner.write().unwrap();
        if !inner.docs.contains_key(&record.document_id) {
            bail!("document not found: {}", record.document_id);
        }
        Ok(inner.push_record(record))
    }

    async fn get_latest_change_record(&self, document_id: &str) -> Result<Option<ChangeRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .records
            .iter()
            .rev()
            .find(|r| r.document_id == document_id)
            .cloned())
    }

    async fn list_change_records(&self, document_id: &str) -> Result<Vec<ChangeRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .records
            .iter()
            .filter(|r| r.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn commit_update(
        &self,
        document_id: &str,
        expected_fingerprint: Option<&str>,
        snapshot: Option<&Snapshot>,
        record: &NewChangeRecord,
    ) -> Result<Commit> {
        let mut inner = self.inner.write().unwrap();
        let doc = match inner.docs.get_mut(document_id) {
            Some(doc) => doc,
            None => bail!("document not found: {}", document_id),
        };
        if doc.fingerprint() != expected_fingerprint {
            return Ok(Commit::Conflict {
                found: doc.fingerprint().map(str::to_string),
            });
        }
        if let Some(snapshot) = snapshot {
            doc.snapshot = Some(snapshot.clone());
        }
        Ok(Commit::Applied(inner.push_record(record)))
    }
}
