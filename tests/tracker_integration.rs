//! Library-level tests of the update cycle against the SQLite store.
//!
//! These run the real [`HttpFetcher`] on `file://` URLs so every layer except
//! the network is exercised.

use std::fs;
use std::sync::Arc;

use doc_churn::config::Config;
use doc_churn::error::UpdateError;
use doc_churn::fetch::HttpFetcher;
use doc_churn::registry::register_url;
use doc_churn::store::sqlite::SqliteStore;
use doc_churn::store::Store;
use doc_churn::tracker::VersionTracker;
use doc_churn::{db, migrate};
use tempfile::TempDir;

async fn setup(tmp: &TempDir) -> (Arc<SqliteStore>, VersionTracker) {
    let config = Config::with_db_path(tmp.path().join("data/churn.sqlite"));
    let pool = db::connect(&config).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();

    let store = Arc::new(SqliteStore::new(pool));
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).unwrap());
    let tracker = VersionTracker::new(store.clone(), fetcher, config.diff);
    (store, tracker)
}

#[tokio::test]
async fn churn_series_follows_file_revisions() {
    let tmp = TempDir::new().unwrap();
    let (store, tracker) = setup(&tmp).await;

    let path = tmp.path().join("doc.txt");
    fs::write(&path, "abc;definitely ghioolies foo bar").unwrap();
    let url = format!("file://{}", path.display());
    let doc = register_url(store.as_ref(), &url).await.unwrap().document;

    let first = tracker.update(&doc.id).await.unwrap();
    assert_eq!((first.abs_word_count, first.changed_word_count), (5, 0));

    fs::write(&path, "abc;dyfinitely ghjoolies  \n jkl3 foo bar").unwrap();
    let second = tracker.update(&doc.id).await.unwrap();
    assert_eq!((second.abs_word_count, second.changed_word_count), (6, 3));

    let third = tracker.update(&doc.id).await.unwrap();
    assert_eq!((third.abs_word_count, third.changed_word_count), (6, 0));

    let records = store.list_change_records(&doc.id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    let stored = store.get_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(
        stored.snapshot.unwrap().text().unwrap(),
        "abc dyfinitely ghjoolies jkl3 foo bar"
    );
}

#[tokio::test]
async fn missing_file_fails_without_writing() {
    let tmp = TempDir::new().unwrap();
    let (store, tracker) = setup(&tmp).await;

    let url = format!("file://{}", tmp.path().join("absent.txt").display());
    let doc = register_url(store.as_ref(), &url).await.unwrap().document;

    let err = tracker.update(&doc.id).await.unwrap_err();
    assert!(matches!(err, UpdateError::Fetch(_)), "got {:?}", err);
    assert!(store.list_change_records(&doc.id).await.unwrap().is_empty());
    assert!(store
        .get_document(&doc.id)
        .await
        .unwrap()
        .unwrap()
        .snapshot
        .is_none());
}

#[tokio::test]
async fn overlapping_updates_never_both_apply() {
    let tmp = TempDir::new().unwrap();
    let (store, tracker) = setup(&tmp).await;

    let path = tmp.path().join("doc.txt");
    fs::write(&path, "one two three four").unwrap();
    let url = format!("file://{}", path.display());
    let doc = register_url(store.as_ref(), &url).await.unwrap().document;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let tracker = tracker.clone();
            let id = doc.id.clone();
            tokio::spawn(async move { tracker.update(&id).await })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(UpdateError::Conflict { .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    // Every applied update appended exactly one record; conflicts appended none.
    let records = store.list_change_records(&doc.id).await.unwrap();
    assert!(applied >= 1);
    assert_eq!(records.len(), applied);
    assert!(records.iter().all(|r| r.abs_word_count == 4));
}

#[tokio::test]
async fn update_all_covers_every_document() {
    let tmp = TempDir::new().unwrap();
    let (store, tracker) = setup(&tmp).await;

    for (name, body) in [("a.txt", "alpha"), ("b.txt", "beta gamma"), ("c.txt", "delta epsilon zeta")] {
        let path = tmp.path().join(name);
        fs::write(&path, body).unwrap();
        register_url(store.as_ref(), &format!("file://{}", path.display()))
            .await
            .unwrap();
    }

    let outcomes = tracker.update_all(2).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    let mut counts: Vec<u64> = outcomes
        .iter()
        .map(|o| o.result.as_ref().unwrap().abs_word_count)
        .collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2, 3]);
}
