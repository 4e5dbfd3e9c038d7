//! Metadata persistence for generated audio.

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::errors::{CollaboratorError, CollaboratorResult};
use crate::models::Payload;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn save_metadata(&self, id: &str, metadata: &Payload) -> CollaboratorResult<()>;

    async fn read_metadata(&self, id: &str) -> CollaboratorResult<Option<Payload>>;

    async fn exists(&self, path: &Path) -> bool;

    /// Size in bytes, 0 when the file is missing
    async fn get_size(&self, path: &Path) -> u64;
}

/// One pretty-printed JSON document per id under a directory
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    metadata_directory: PathBuf,
}

impl LocalFileStorage {
    pub fn new(metadata_directory: impl Into<PathBuf>) -> Self {
        Self {
            metadata_directory: metadata_directory.into(),
        }
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.metadata_directory.join(format!("{id}.json"))
    }
}

#[async_trait]
impl MetadataStore for LocalFileStorage {
    async fn save_metadata(&self, id: &str, metadata: &Payload) -> CollaboratorResult<()> {
        tokio::fs::create_dir_all(&self.metadata_directory).await?;
        let body = serde_json::to_vec_pretty(metadata)?;
        let path = self.metadata_path(id);
        tokio::fs::write(&path, body).await?;
        debug!(id = %id, path = %path.display(), "Metadata saved");
        Ok(())
    }

    async fn read_metadata(&self, id: &str) -> CollaboratorResult<Option<Payload>> {
        let path = self.metadata_path(id);
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Some(serde_json::from_slice(&body)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CollaboratorError::from(e)),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn get_size(&self, path: &Path) -> u64 {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

/// Metadata kept in a concurrent map; file queries still hit the filesystem
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: DashMap<String, Payload>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn save_metadata(&self, id: &str, metadata: &Payload) -> CollaboratorResult<()> {
        self.records.insert(id.to_string(), metadata.clone());
        Ok(())
    }

    async fn read_metadata(&self, id: &str) -> CollaboratorResult<Option<Payload>> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn get_size(&self, path: &Path) -> u64 {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Payload {
        json!({"audio_id": "abc", "file_size": 12})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("metadata"));

        storage.save_metadata("abc", &sample()).await.unwrap();
        assert_eq!(storage.read_metadata("abc").await.unwrap(), Some(sample()));
        assert_eq!(storage.read_metadata("missing").await.unwrap(), None);
        assert!(storage.exists(&dir.path().join("metadata/abc.json")).await);
    }

    #[tokio::test]
    async fn test_get_size() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.wav");
        std::fs::write(&file, b"12345").unwrap();

        let storage = InMemoryMetadataStore::new();
        assert_eq!(storage.get_size(&file).await, 5);
        assert_eq!(storage.get_size(&dir.path().join("nope.wav")).await, 0);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryMetadataStore::new();
        assert!(store.is_empty());
        store.save_metadata("x", &sample()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.read_metadata("x").await.unwrap(), Some(sample()));
    }
}
