//! Blob store trait for opaque byte storage.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for blob storage backends.
///
/// A blob store holds raw file bytes under logical paths. It has no
/// authority over record state: version numbers and statuses live in the
/// record store, and the blob store is never consulted to decide them.
/// The trait is defined here in `recordhub-core` and implemented in
/// `recordhub-storage`.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Write bytes at the given path, creating parent directories as
    /// needed. The write is atomic: a partially written blob is never
    /// observable under the final path.
    async fn put(&self, path: &str, data: Bytes) -> AppResult<()>;

    /// Read the blob at the given path into memory.
    async fn get(&self, path: &str) -> AppResult<Bytes>;

    /// Delete the blob at the given path. Absence of the target is not
    /// an error.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Delete every blob under the given path prefix (a directory tree).
    /// Absence of the prefix is not an error.
    async fn delete_prefix(&self, prefix: &str) -> AppResult<()>;

    /// Check whether a blob exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;
}
