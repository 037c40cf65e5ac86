//! Registering URLs for tracking.
//!
//! A document's id is the SHA-512 hex of its URL, so registering the same URL
//! twice is a no-op that returns the existing document.

use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::fetch::HttpFetcher;
use crate::models::TrackedDocument;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;
use crate::tracker::{print_record, VersionTracker};

const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "file"];

/// Outcome of [`register_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub document: TrackedDocument,
    /// `false` when the URL was already tracked.
    pub created: bool,
}

/// Check that `url` parses and uses a scheme the fetcher understands.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
    if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
        bail!(
            "unsupported URL scheme '{}' (expected one of: {})",
            parsed.scheme(),
            SUPPORTED_SCHEMES.join(", ")
        );
    }
    Ok(())
}

/// Start tracking `url`, or return the existing document for it.
pub async fn register_url(store: &dyn Store, url: &str) -> Result<Registration> {
    validate_url(url)?;

    let doc = TrackedDocument::new(url);
    if store.put_document(&doc).await? {
        info!("Registered {} as {}", url, doc.id);
        return Ok(Registration {
            document: doc,
            created: true,
        });
    }

    let existing = store
        .get_document(&doc.id)
        .await?
        .with_context(|| format!("document {} vanished after registration", doc.id))?;
    Ok(Registration {
        document: existing,
        created: false,
    })
}

/// Entry point for `churn add`: register, then run the first update cycle.
pub async fn run_add(config: &Config, url: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool.clone()));

    let outcome = async {
        let registration = register_url(store.as_ref(), url).await?;
        let id = registration.document.id.clone();

        println!("add {}", url);
        println!("  id: {}", id);
        if !registration.created {
            println!("  already tracked");
        }

        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        let tracker = VersionTracker::new(store.clone(), fetcher, config.diff);
        let record = tracker.update(&id).await?;
        print_record(&record);
        println!("ok");
        Ok::<_, anyhow::Error>(())
    }
    .await;

    pool.close().await;
    outcome
}
