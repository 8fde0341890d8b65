//! File revision entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use recordhub_core::types::{RecordId, RevisionId};

/// One immutable stored file tied to a specific version of a record.
///
/// A record may own several revisions sharing the same version number
/// (multiple files uploaded into one version bucket), but the
/// `(record_id, version, filename)` triple is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRevision {
    /// Unique revision identifier.
    pub id: RevisionId,
    /// The owning record, referenced by id only.
    pub record_id: RecordId,
    /// Version bucket this revision belongs to (>= 1).
    pub version: i32,
    /// Resolved, collision-free filename within the bucket.
    pub filename: String,
    /// Where the blob lives, derived from `(record_id, version, filename)`.
    pub storage_path: String,
    /// Size of the stored blob in bytes.
    pub file_size_bytes: i64,
    /// Declared MIME type.
    pub mime_type: String,
    /// Lowercase filename extension without the dot (may be empty).
    pub extension: String,
    /// Content digest of the stored bytes (SHA-256, hex).
    pub content_hash: Option<String>,
    /// Optional caller-supplied note for this upload.
    pub notes: Option<String>,
    /// When the revision was accepted.
    pub created_at: DateTime<Utc>,
}
