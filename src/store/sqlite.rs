//! SQLite-backed [`Store`] implementation.
//!
//! Timestamps are stored as Unix milliseconds. [`SqliteStore::commit_update`]
//! performs its compare-and-set as a guarded `UPDATE ... WHERE fingerprint IS ?`
//! inside the same transaction that appends the record.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::models::{ChangeRecord, NewChangeRecord, TrackedDocument};
use crate::snapshot::Snapshot;

use super::{Commit, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("timestamp out of range: {}", ms))
}

fn row_to_document(row: &SqliteRow) -> Result<TrackedDocument> {
    let fingerprint: Option<String> = row.get("fingerprint");
    let blob: Option<Vec<u8>> = row.get("snapshot");
    let snapshot = match (fingerprint, blob) {
        (Some(fp), Some(blob)) => Some(Snapshot::from_parts(fp, blob)),
        (None, None) => None,
        _ => bail!("document has a fingerprint without a snapshot or vice versa"),
    };
    Ok(TrackedDocument {
        id: row.get("id"),
        url: row.get("url"),
        snapshot,
        created_at: from_millis(row.get("created_at"))?,
    })
}

fn row_to_record(row: &SqliteRow) -> Result<ChangeRecord> {
    let abs: i64 = row.get("abs_word_count");
    let changed: i64 = row.get("changed_word_count");
    Ok(ChangeRecord {
        id: row.get("id"),
        document_id: row.get("document_id"),
        abs_word_count: abs as u64,
        changed_word_count: changed as u64,
        created_at: from_millis(row.get("created_at"))?,
    })
}

/// Append a record, clamping its timestamp to the document's latest one.
async fn insert_record(
    conn: &mut SqliteConnection,
    record: &NewChangeRecord,
) -> Result<ChangeRecord> {
    let latest: Option<i64> =
        sqlx::query_scalar("SELECT MAX(created_at) FROM change_records WHERE document_id = ?")
            .bind(&record.document_id)
            .fetch_one(&mut *conn)
            .await?;
    let created_ms = latest.map_or(record.created_at.timestamp_millis(), |l| {
        l.max(record.created_at.timestamp_millis())
    });

    let result = sqlx::query(
        r#"
        INSERT INTO change_records (document_id, abs_word_count, changed_word_count, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&record.document_id)
    .bind(record.abs_word_count as i64)
    .bind(record.changed_word_count as i64)
    .bind(created_ms)
    .execute(&mut *conn)
    .await?;

    Ok(ChangeRecord {
        id: result.last_insert_rowid(),
        document_id: record.document_id.clone(),
        abs_word_count: record.abs_word_count,
        changed_word_count: record.changed_word_count,
        created_at: from_millis(created_ms)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_document(&self, id: &str) -> Result<Option<TrackedDocument>> {
        let row = sqlx::query(
            "SELECT id, url, fingerprint, snapshot, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn put_document(&self, doc: &TrackedDocument) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (id, url, fingerprint, snapshot, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.url)
        .bind(doc.snapshot.as_ref().map(|s| s.fingerprint()))
        .bind(doc.snapshot.as_ref().map(|s| s.compressed_text()))
        .bind(doc.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_documents(&self) -> Result<Vec<TrackedDocument>> {
        let rows = sqlx::query(
            "SELECT id, url, fingerprint, snapshot, created_at FROM documents ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn append_change_record(&self, record: &NewChangeRecord) -> Result<ChangeRecord> {
        let mut tx = self.pool.begin().await?;
        let stored = insert_record(&mut *tx, record).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn get_latest_change_record(&self, document_id: &str) -> Result<Option<ChangeRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, document_id, abs_word_count, changed_word_count, created_at
            FROM change_records
            WHERE document_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_change_records(&self, document_id: &str) -> Result<Vec<ChangeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, abs_word_count, changed_word_count, created_at
            FROM change_records
            WHERE document_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn commit_update(
        &self,
        document_id: &str,
        expected_fingerprint: Option<&str>,
        snapshot: Option<&Snapshot>,
        record: &NewChangeRecord,
    ) -> Result<Commit> {
        let mut tx = self.pool.begin().await?;

        // The no-op assignment still takes the write lock and proves the
        // fingerprint is unchanged for the rest of the transaction.
        let guarded = match snapshot {
            Some(snap) => sqlx::query(
                "UPDATE documents SET fingerprint = ?, snapshot = ? WHERE id = ? AND fingerprint IS ?",
            )
            .bind(snap.fingerprint())
            .bind(snap.compressed_text())
            .bind(document_id)
            .bind(expected_fingerprint),
            None => sqlx::query(
                "UPDATE documents SET fingerprint = fingerprint WHERE id = ? AND fingerprint IS ?",
            )
            .bind(document_id)
            .bind(expected_fingerprint),
        };
        let updated = guarded.execute(&mut *tx).await?.rows_affected();

        if updated == 0 {
            let found: Option<Option<String>> =
                sqlx::query_scalar("SELECT fingerprint FROM documents WHERE id = ?")
                    .bind(document_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return match found {
                Some(found) => Ok(Commit::Conflict { found }),
                None => bail!("document not found: {}", document_id),
            };
        }

        let stored = insert_record(&mut *tx, record).await?;
        tx.commit().await?;
        Ok(Commit::Applied(stored))
    }
}
