//! Version-group projection over file revisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::FileRevision;

/// All revisions of a record sharing one version number, as rendered in
/// version listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionGroup {
    /// The shared version number.
    pub version: i32,
    /// Revisions in this bucket, ordered by upload time ascending.
    pub files: Vec<FileRevision>,
    /// Number of revisions in this bucket.
    pub file_count: usize,
    /// Upload time of the earliest revision in this bucket.
    pub earliest_upload_at: Option<DateTime<Utc>>,
}

impl VersionGroup {
    /// Build a group from the revisions of one bucket.
    pub fn new(version: i32, mut files: Vec<FileRevision>) -> Self {
        files.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let earliest_upload_at = files.first().map(|f| f.created_at);
        Self {
            version,
            file_count: files.len(),
            earliest_upload_at,
            files,
        }
    }
}
