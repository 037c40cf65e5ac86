//! The version tracker: one update cycle per document.
//!
//! An update fetches the document, fingerprints the raw bytes and either
//! takes the unchanged-content fast path or runs the full
//! detect → extract → normalize → diff pipeline against the stored snapshot.
//! Either way exactly one [`ChangeRecord`] is appended on success, and on any
//! failure nothing is written.
//!
//! The new snapshot and the record are committed through
//! [`Store::commit_update`], guarded by the fingerprint read at the start of
//! the cycle. Two overlapping updates of the same document can therefore
//! never both apply; the loser fails with [`UpdateError::Conflict`].
//!
//! CPU-bound work (PDF extraction, decompression, diffing, compression) runs
//! on the blocking thread pool so concurrent updates don't stall the runtime.

use std::sync::Arc;

use anyhow::{bail, Result};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db;
use crate::diff::{diff, DiffOptions};
use crate::error::UpdateError;
use crate::extract::extract_text;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::fingerprint::fingerprint;
use crate::models::{ChangeRecord, NewChangeRecord, TrackedDocument};
use crate::normalize::normalize;
use crate::snapshot::Snapshot;
use crate::store::sqlite::SqliteStore;
use crate::store::{Commit, Store};

/// Result of updating one document as part of [`VersionTracker::update_all`].
#[derive(Debug)]
pub struct UpdateOutcome {
    pub document_id: String,
    pub url: String,
    pub result: Result<ChangeRecord, UpdateError>,
}

/// Runs update cycles against a store using a fetcher.
///
/// Cheap to clone; clones share the store and fetcher.
#[derive(Clone)]
pub struct VersionTracker {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn Fetcher>,
    options: DiffOptions,
}

impl VersionTracker {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>, options: DiffOptions) -> Self {
        Self {
            store,
            fetcher,
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Run one update cycle for `document_id`.
    pub async fn update(&self, document_id: &str) -> Result<ChangeRecord, UpdateError> {
        let doc = self
            .store
            .get_document(document_id)
            .await
            .map_err(UpdateError::Store)?
            .ok_or_else(|| UpdateError::UnknownDocument(document_id.to_string()))?;

        let bytes = self.fetcher.fetch(&doc.url).await?;
        let fp = fingerprint(&bytes);
        debug!("Fetched {} bytes from {}", bytes.len(), doc.url);

        if doc.fingerprint() == Some(fp.as_str()) {
            let latest = self
                .store
                .get_latest_change_record(&doc.id)
                .await
                .map_err(UpdateError::Store)?;
            match latest {
                Some(prev) => {
                    let record = NewChangeRecord::new(&doc.id, prev.abs_word_count, 0);
                    let stored = self.commit(&doc, None, &record).await?;
                    info!("Unchanged: {} ({} words)", doc.url, stored.abs_word_count);
                    return Ok(stored);
                }
                // A snapshot without history only happens if records were
                // removed externally; recompute from the bytes instead.
                None => warn!(
                    "Document {} has a snapshot but no change records, recomputing",
                    doc.id
                ),
            }
        }

        let prior = doc.snapshot.clone();
        let options = self.options;
        let (stats, snapshot) = tokio::task::spawn_blocking(move || {
            let text = extract_text(&bytes)?;
            let normalized = normalize(&text);
            let old_text = prior.as_ref().map(Snapshot::text).transpose()?;
            let stats = diff(&normalized, old_text.as_deref(), &options);
            let snapshot = Snapshot::capture(fp, &normalized)?;
            Ok::<_, UpdateError>((stats, snapshot))
        })
        .await??;

        let record = NewChangeRecord::new(
            &doc.id,
            stats.abs_word_count as u64,
            stats.changed_word_count as u64,
        );
        let stored = self.commit(&doc, Some(&snapshot), &record).await?;
        info!(
            "Updated: {} ({} words, {} changed)",
            doc.url, stored.abs_word_count, stored.changed_word_count
        );
        Ok(stored)
    }

    async fn commit(
        &self,
        doc: &TrackedDocument,
        snapshot: Option<&Snapshot>,
        record: &NewChangeRecord,
    ) -> Result<ChangeRecord, UpdateError> {
        let commit = self
            .store
            .commit_update(&doc.id, doc.fingerprint(), snapshot, record)
            .await
            .map_err(UpdateError::Store)?;
        match commit {
            Commit::Applied(stored) => Ok(stored),
            Commit::Conflict { found } => Err(UpdateError::Conflict {
                document_id: doc.id.clone(),
                found,
            }),
        }
    }

    /// Update every tracked document, at most `concurrency` at a time.
    ///
    /// One document failing does not stop the others; every outcome is
    /// returned, in completion order.
    pub async fn update_all(&self, concurrency: usize) -> Result<Vec<UpdateOutcome>> {
        let docs = self.store.list_documents().await?;
        info!(
            "Updating {} documents (concurrency {})",
            docs.len(),
            concurrency
        );

        let outcomes = stream::iter(docs.into_iter().map(|doc| {
            let tracker = self.clone();
            async move {
                let result = tracker.update(&doc.id).await;
                if let Err(ref e) = result {
                    warn!("Update of {} failed ({}): {}", doc.url, e.kind(), e);
                }
                UpdateOutcome {
                    document_id: doc.id,
                    url: doc.url,
                    result,
                }
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

        Ok(outcomes)
    }
}

/// What `churn update` should process.
pub enum UpdateTarget<'a> {
    One(&'a str),
    All,
}

/// Entry point for `churn update`.
pub async fn run_update(config: &Config, target: UpdateTarget<'_>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool.clone()));
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let tracker = VersionTracker::new(store, fetcher, config.diff);

    let outcome = match target {
        UpdateTarget::One(id) => update_one(&tracker, id).await,
        UpdateTarget::All => update_every(&tracker, config.update.concurrency).await,
    };

    pool.close().await;
    outcome
}

async fn update_one(tracker: &VersionTracker, id: &str) -> Result<()> {
    let record = tracker.update(id).await?;
    println!("update {}", id);
    print_record(&record);
    println!("ok");
    Ok(())
}

async fn update_every(tracker: &VersionTracker, concurrency: usize) -> Result<()> {
    let outcomes = tracker.update_all(concurrency).await?;
    let mut failed = 0;

    println!("update all");
    for outcome in &outcomes {
        match &outcome.result {
            Ok(record) => println!(
                "  {}  abs={} changed={}",
                outcome.url, record.abs_word_count, record.changed_word_count
            ),
            Err(e) => {
                failed += 1;
                println!("  {}  error: {}", outcome.url, e);
            }
        }
    }
    println!("  updated: {}", outcomes.len() - failed);
    println!("  failed: {}", failed);

    if failed > 0 {
        bail!("{} of {} documents failed to update", failed, outcomes.len());
    }
    println!("ok");
    Ok(())
}

pub(crate) fn print_record(record: &ChangeRecord) {
    println!("  abs words: {}", record.abs_word_count);
    println!("  changed words: {}", record.changed_word_count);
    println!("  recorded: {}", record.created_at.to_rfc3339());
}
