use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

/// A stored object addressed by its key, e.g. `{spaceId}/tabs/{tabName}`.
#[derive(Debug, Clone, FromRow)]
pub struct Blob {
    pub key: String,
    pub data: Vec<u8>,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of renaming a blob key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    SourceMissing,
    DestinationExists,
}

impl Blob {
    pub async fn find_by_key(pool: &SqlitePool, key: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Blob>(
            r#"SELECT key, data, content_type, created_at, updated_at
               FROM blobs
               WHERE key = $1"#,
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Insert or replace the blob at `key`.
    pub async fn upsert(
        pool: &SqlitePool,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO blobs (key, data, content_type)
               VALUES ($1, $2, $3)
               ON CONFLICT(key) DO UPDATE SET
                   data = excluded.data,
                   content_type = excluded.content_type,
                   updated_at = datetime('now', 'subsec')"#,
        )
        .bind(key)
        .bind(data)
        .bind(content_type)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Insert the blob only if `key` is free. Returns false when it was taken.
    pub async fn insert_new(
        pool: &SqlitePool,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"INSERT INTO blobs (key, data, content_type)
               VALUES ($1, $2, $3)
               ON CONFLICT(key) DO NOTHING"#,
        )
        .bind(key)
        .bind(data)
        .bind(content_type)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move the blob at `from` to `to` without touching an existing `to`.
    pub async fn rename(
        pool: &SqlitePool,
        from: &str,
        to: &str,
    ) -> Result<RenameOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let destination_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blobs WHERE key = $1")
                .bind(to)
                .fetch_one(&mut *tx)
                .await?
                > 0;
        if destination_taken {
            return Ok(RenameOutcome::DestinationExists);
        }

        let result = sqlx::query(
            r#"UPDATE blobs
               SET key = $2, updated_at = datetime('now', 'subsec')
               WHERE key = $1"#,
        )
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(RenameOutcome::SourceMissing);
        }

        tx.commit().await?;
        Ok(RenameOutcome::Renamed)
    }

    /// Delete every listed key, returning the keys that existed.
    pub async fn delete_many(pool: &SqlitePool, keys: &[String]) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut removed = Vec::with_capacity(keys.len());

        for key in keys {
            let result = sqlx::query("DELETE FROM blobs WHERE key = $1")
                .bind(key)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() > 0 {
                removed.push(key.clone());
            }
        }

        tx.commit().await?;
        Ok(removed)
    }
}
