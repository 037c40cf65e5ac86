use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Fingerprint and snapshot are written together or not at all.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL UNIQUE,
            fingerprint TEXT,
            snapshot BLOB,
            created_at INTEGER NOT NULL,
            CHECK ((fingerprint IS NULL) = (snapshot IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS change_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id TEXT NOT NULL,
            abs_word_count INTEGER NOT NULL CHECK (abs_word_count >= 0),
            changed_word_count INTEGER NOT NULL CHECK (changed_word_count >= 0),
            created_at INTEGER NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_change_records_document ON change_records(document_id, id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
