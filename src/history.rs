//! Reading back tracked documents and their churn time series.
//!
//! Backs `churn list` and `churn history`.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::db;
use crate::models::{ChangeRecord, TrackedDocument};
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// One row of `churn list`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub url: String,
    pub fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_record: Option<ChangeRecord>,
}

/// A document together with every record appended for it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentHistory {
    pub id: String,
    pub url: String,
    pub fingerprint: Option<String>,
    pub records: Vec<ChangeRecord>,
}

fn summarize(doc: TrackedDocument, last_record: Option<ChangeRecord>) -> DocumentSummary {
    DocumentSummary {
        fingerprint: doc.fingerprint().map(str::to_string),
        id: doc.id,
        url: doc.url,
        created_at: doc.created_at,
        last_record,
    }
}

pub async fn list_summaries(store: &dyn Store) -> Result<Vec<DocumentSummary>> {
    let docs = store.list_documents().await?;
    let mut summaries = Vec::with_capacity(docs.len());
    for doc in docs {
        let last = store.get_latest_change_record(&doc.id).await?;
        summaries.push(summarize(doc, last));
    }
    Ok(summaries)
}

pub async fn document_history(store: &dyn Store, id: &str) -> Result<DocumentHistory> {
    let doc = match store.get_document(id).await? {
        Some(doc) => doc,
        None => bail!("document not found: {}", id),
    };
    let records = store.list_change_records(id).await?;
    Ok(DocumentHistory {
        fingerprint: doc.fingerprint().map(str::to_string),
        id: doc.id,
        url: doc.url,
        records,
    })
}

/// Entry point for `churn list`.
pub async fn run_list(config: &Config, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let summaries = list_summaries(&store).await;
    pool.close().await;
    let summaries = summaries?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No tracked documents.");
        return Ok(());
    }

    for summary in &summaries {
        println!("{}", summary.id);
        println!("  url: {}", summary.url);
        match &summary.last_record {
            Some(record) => println!(
                "  last update: {}  abs={} changed={}",
                record.created_at.to_rfc3339(),
                record.abs_word_count,
                record.changed_word_count
            ),
            None => println!("  last update: never"),
        }
    }
    Ok(())
}

/// Entry point for `churn history`.
pub async fn run_history(config: &Config, id: &str, json: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let history = document_history(&store, id).await;
    pool.close().await;
    let history = history?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    println!("history {}", history.id);
    println!("  url: {}", history.url);
    println!("  records: {}", history.records.len());
    for record in &history.records {
        println!(
            "  {}  abs={} changed={}",
            record.created_at.to_rfc3339(),
            record.abs_word_count,
            record.changed_word_count
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewChangeRecord;
    use crate::store::memory::InMemoryStore;

    #[tokio::test]
    async fn history_lists_records_in_order() {
        let store = InMemoryStore::new();
        let doc = TrackedDocument::new("https://example.com/a");
        store.put_document(&doc).await.unwrap();
        for (abs, changed) in [(10, 0), (12, 3), (12, 0)] {
            store
                .append_change_record(&NewChangeRecord::new(&doc.id, abs, changed))
                .await
                .unwrap();
        }

        let history = document_history(&store, &doc.id).await.unwrap();
        assert_eq!(history.url, doc.url);
        let counts: Vec<_> = history
            .records
            .iter()
            .map(|r| (r.abs_word_count, r.changed_word_count))
            .collect();
        assert_eq!(counts, vec![(10, 0), (12, 3), (12, 0)]);

        let value = serde_json::to_value(&history).unwrap();
        assert_eq!(value["records"][1]["changed_word_count"], 3);
        assert!(value["fingerprint"].is_null());
    }

    #[tokio::test]
    async fn unknown_document_history_fails() {
        let store = InMemoryStore::new();
        let err = document_history(&store, "missing").await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn summaries_carry_latest_record() {
        let store = InMemoryStore::new();
        let fresh = TrackedDocument::new("https://example.com/fresh");
        let seen = TrackedDocument::new("https://example.com/seen");
        store.put_document(&fresh).await.unwrap();
        store.put_document(&seen).await.unwrap();
        store
            .append_change_record(&NewChangeRecord::new(&seen.id, 5, 0))
            .await
            .unwrap();
        store
            .append_change_record(&NewChangeRecord::new(&seen.id, 7, 2))
            .await
            .unwrap();

        let summaries = list_summaries(&store).await.unwrap();
        assert_eq!(summaries.len(), 2);
        let seen_summary = summaries.iter().find(|s| s.id == seen.id).unwrap();
        assert_eq!(seen_summary.last_record.as_ref().unwrap().abs_word_count, 7);
        let fresh_summary = summaries.iter().find(|s| s.id == fresh.id).unwrap();
        assert!(fresh_summary.last_record.is_none());
    }
}
