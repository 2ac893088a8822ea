//! Key/blob storage used for tab documents and tab order files.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use db::models::blob::{Blob, RenameOutcome};
use sqlx::SqlitePool;
use thiserror::Error;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Error)]
pub enum BlobStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for BlobStoreError {
    fn from(err: sqlx::Error) -> Self {
        BlobStoreError::Backend(err.to_string())
    }
}

impl BlobStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobStoreError::NotFound(_))
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError>;

    /// Store `data` at `key`. Without `upsert` an existing key is an error.
    async fn upload(&self, key: &str, data: Vec<u8>, upsert: bool) -> Result<(), BlobStoreError>;

    /// Rename `from` to `to`. Fails with `NotFound` when `from` is absent and
    /// with `AlreadyExists` when `to` is taken.
    async fn move_object(&self, from: &str, to: &str) -> Result<(), BlobStoreError>;

    /// Remove `keys`, returning those that existed.
    async fn remove(&self, keys: &[String]) -> Result<Vec<String>, BlobStoreError>;
}

pub type DynBlobStore = Arc<dyn BlobStore>;

/// Blob store persisted in the registry SQLite database.
#[derive(Clone)]
pub struct SqliteBlobStore {
    pool: SqlitePool,
}

impl SqliteBlobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        Ok(Blob::find_by_key(&self.pool, key).await?.map(|blob| blob.data))
    }

    async fn upload(&self, key: &str, data: Vec<u8>, upsert: bool) -> Result<(), BlobStoreError> {
        if upsert {
            Blob::upsert(&self.pool, key, &data, JSON_CONTENT_TYPE).await?;
            return Ok(());
        }
        if Blob::insert_new(&self.pool, key, &data, JSON_CONTENT_TYPE).await? {
            Ok(())
        } else {
            Err(BlobStoreError::AlreadyExists(key.to_string()))
        }
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<(), BlobStoreError> {
        match Blob::rename(&self.pool, from, to).await? {
            RenameOutcome::Renamed => Ok(()),
            RenameOutcome::SourceMissing => Err(BlobStoreError::NotFound(from.to_string())),
            RenameOutcome::DestinationExists => Err(BlobStoreError::AlreadyExists(to.to_string())),
        }
    }

    async fn remove(&self, keys: &[String]) -> Result<Vec<String>, BlobStoreError> {
        Ok(Blob::delete_many(&self.pool, keys).await?)
    }
}

/// Process-local blob store. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }

    async fn upload(&self, key: &str, data: Vec<u8>, upsert: bool) -> Result<(), BlobStoreError> {
        match self.objects.entry(key.to_string()) {
            Entry::Occupied(mut entry) if upsert => {
                entry.insert(data);
                Ok(())
            }
            Entry::Occupied(_) => Err(BlobStoreError::AlreadyExists(key.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(data);
                Ok(())
            }
        }
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<(), BlobStoreError> {
        let (_, data) = self
            .objects
            .remove(from)
            .ok_or_else(|| BlobStoreError::NotFound(from.to_string()))?;
        // The destination check and insert happen under one shard lock.
        match self.objects.entry(to.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(data);
                Ok(())
            }
            Entry::Occupied(taken) => {
                drop(taken);
                // Restore the source unless it was rewritten in the meantime.
                self.objects.entry(from.to_string()).or_insert(data);
                Err(BlobStoreError::AlreadyExists(to.to_string()))
            }
        }
    }

    async fn remove(&self, keys: &[String]) -> Result<Vec<String>, BlobStoreError> {
        Ok(keys
            .iter()
            .filter(|key| self.objects.remove(key.as_str()).is_some())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    async fn exercise(store: &dyn BlobStore) {
        store.upload("s/tabs/a", b"1".to_vec(), false).await.unwrap();
        assert!(matches!(
            store.upload("s/tabs/a", b"2".to_vec(), false).await,
            Err(BlobStoreError::AlreadyExists(_))
        ));
        store.upload("s/tabs/a", b"3".to_vec(), true).await.unwrap();
        assert_eq!(store.download("s/tabs/a").await.unwrap(), Some(b"3".to_vec()));

        let missing = store.move_object("s/tabs/ghost", "s/tabs/z").await.unwrap_err();
        assert!(missing.is_not_found());

        store.upload("s/tabs/b", b"b".to_vec(), true).await.unwrap();
        assert!(matches!(
            store.move_object("s/tabs/a", "s/tabs/b").await,
            Err(BlobStoreError::AlreadyExists(_))
        ));

        store.move_object("s/tabs/a", "s/tabs/c").await.unwrap();
        assert_eq!(store.download("s/tabs/a").await.unwrap(), None);
        assert_eq!(store.download("s/tabs/c").await.unwrap(), Some(b"3".to_vec()));

        let removed = store
            .remove(&["s/tabs/c".to_string(), "s/tabs/nope".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, vec!["s/tabs/c".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_store_semantics() {
        let store = MemoryBlobStore::new();
        exercise(&store).await;
        assert_eq!(store.len(), 1);
        assert!(store.contains("s/tabs/b"));
    }

    #[tokio::test]
    async fn test_memory_move_onto_taken_key_keeps_both() {
        let store = MemoryBlobStore::new();
        store.upload("s/tabs/a", b"a".to_vec(), false).await.unwrap();
        store.upload("s/tabs/b", b"b".to_vec(), false).await.unwrap();

        let err = store.move_object("s/tabs/a", "s/tabs/b").await.unwrap_err();
        assert!(matches!(err, BlobStoreError::AlreadyExists(ref key) if key == "s/tabs/b"));
        assert_eq!(store.download("s/tabs/a").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.download("s/tabs/b").await.unwrap(), Some(b"b".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_concurrent_moves_to_one_key() {
        let store = MemoryBlobStore::new();
        for n in 0..16 {
            store
                .upload(&format!("s/tabs/src{n}"), vec![n as u8], false)
                .await
                .unwrap();
        }

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.move_object(&format!("s/tabs/src{n}"), "s/tabs/dst").await
                })
            })
            .collect();
        let mut renamed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => renamed += 1,
                Err(e) => assert!(matches!(e, BlobStoreError::AlreadyExists(_))),
            }
        }

        assert_eq!(renamed, 1);
        assert_eq!(store.len(), 16);
        assert!(store.contains("s/tabs/dst"));
    }

    #[tokio::test]
    async fn test_sqlite_store_semantics() {
        let db = DBService::new_in_memory().await.unwrap();
        exercise(&SqliteBlobStore::new(db.pool.clone())).await;
    }
}
