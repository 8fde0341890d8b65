//! Local filesystem blob store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use recordhub_core::error::{AppError, ErrorKind};
use recordhub_core::result::AppResult;
use recordhub_core::traits::BlobStore;

/// Local filesystem blob store.
///
/// Writes go to a temporary sibling file first and are renamed into
/// place, so a partially written blob is never observable under its
/// final path.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    /// Root directory for all stored blobs.
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new blob store rooted at the given path.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Resolve a relative path to an absolute path within the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let clean = path.trim_start_matches('/');
        self.root.join(clean)
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, data: Bytes) -> AppResult<()> {
        let full_path = self.resolve(path);
        self.ensure_parent(&full_path).await?;

        // Write-then-rename keeps half-written blobs out of the bucket.
        let tmp_path = full_path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        fs::write(&tmp_path, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write blob: {path}"),
                e,
            )
        })?;

        if let Err(e) = fs::rename(&tmp_path, &full_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to finalize blob: {path}"),
                e,
            ));
        }

        debug!(path, bytes = data.len(), "Wrote blob");
        Ok(())
    }

    async fn get(&self, path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(path);
        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {path}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read blob: {path}"),
                    e,
                )
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path);
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob: {path}"),
                e,
            )),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<()> {
        let full_path = self.resolve(prefix);
        match fs::remove_dir_all(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(prefix, error = %e, "Failed to delete blob prefix");
                Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete blob prefix: {prefix}"),
                    e,
                ))
            }
        }
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.resolve(path).exists())
    }
}

#[cfg(test)]
mod tests {
    use recordhub_core::error::ErrorKind;

    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        let data = Bytes::from("record bytes");
        store
            .put("records/r1/v1/report.pdf", data.clone())
            .await
            .unwrap();
        assert!(store.exists("records/r1/v1/report.pdf").await.unwrap());

        let read_back = store.get("records/r1/v1/report.pdf").await.unwrap();
        assert_eq!(read_back, data);

        store.delete("records/r1/v1/report.pdf").await.unwrap();
        assert!(!store.exists("records/r1/v1/report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        store.delete("records/r1/v1/missing.pdf").await.unwrap();
        store.delete_prefix("records/missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        let err = store.get("records/r1/v1/missing.pdf").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_put_overwrites_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        store
            .put("records/r1/v1/a.pdf", Bytes::from("one"))
            .await
            .unwrap();
        store
            .put("records/r1/v1/a.pdf", Bytes::from("two"))
            .await
            .unwrap();
        assert_eq!(
            store.get("records/r1/v1/a.pdf").await.unwrap(),
            Bytes::from("two")
        );

        // No temp files left behind.
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("records/r1/v1"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_prefix_removes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        store
            .put("records/r1/v1/a.pdf", Bytes::from("a"))
            .await
            .unwrap();
        store
            .put("records/r1/v2/b.pdf", Bytes::from("b"))
            .await
            .unwrap();

        store.delete_prefix("records/r1").await.unwrap();
        assert!(!store.exists("records/r1/v1/a.pdf").await.unwrap());
        assert!(!store.exists("records/r1/v2/b.pdf").await.unwrap());
    }
}
