//! # recordhub-storage
//!
//! Blob storage for RecordHub. Implements the [`BlobStore`] trait from
//! `recordhub-core` over the local filesystem and provides the content
//! digest and blob path helpers used by the versioning engine.
//!
//! [`BlobStore`]: recordhub_core::traits::BlobStore

pub mod digest;
pub mod local;
pub mod path;

pub use digest::content_digest;
pub use local::LocalBlobStore;
pub use path::{record_blob_prefix, revision_blob_path};
