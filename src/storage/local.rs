//! Local filesystem blob store.
//!
//! Blobs are files below a root directory. Writes go to a temporary file
//! first and are renamed into place, so a reader never sees a half-written
//! snapshot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(key)).await?)
    }

    async fn create_dir_all(&self, key: &str) -> Result<()> {
        tokio::fs::create_dir_all(self.path(key)).await?;
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn location(&self, key: &str) -> String {
        self.path(key).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write("cities/619/test.json", b"hello").await.unwrap();
        let data = storage.read("cities/619/test.json").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(storage.exists("cities/619/test.json").await.unwrap());
        assert!(!tmp.path().join("cities/619/test.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.read("nope.txt").await.unwrap().is_none());
        assert!(!storage.exists("nope.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_dir_all() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.create_dir_all("bikes/930001").await.unwrap();
        assert!(tmp.path().join("bikes/930001").is_dir());
        // Creating it again is fine.
        storage.create_dir_all("bikes/930001").await.unwrap();
    }

    #[test]
    fn test_location_is_absolute_path() {
        let storage = LocalStorage::new("/var/lib/nextbike");
        assert_eq!(
            storage.location("cities/619/log.json"),
            "/var/lib/nextbike/cities/619/log.json"
        );
    }
}
