//! Product record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use recordhub_core::types::RecordId;

use super::status::RecordStatus;

/// A versioned product record.
///
/// A record accumulates immutable file revisions over time. Its
/// `current_version` starts at 1 and is incremented by exactly one per
/// accepted modification; `status` follows the linear lifecycle in
/// [`RecordStatus`]. Revisions reference the record by id only — the
/// record is the authority over its version counter and status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Record {
    /// Unique record identifier.
    pub id: RecordId,
    /// Caller-supplied unique business key (1-100 chars).
    pub record_code: String,
    /// Grouping key (1-50 chars), not unique.
    pub shop_code: String,
    /// Current version number, starting at 1.
    pub current_version: i32,
    /// Lifecycle status.
    pub status: RecordStatus,
    /// Optional free-text description.
    pub description: Option<String>,
    /// When the record was finalized. Set together with `finalized_by`,
    /// exactly once.
    pub finalized_at: Option<DateTime<Utc>>,
    /// Who finalized the record.
    pub finalized_by: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Build a fresh record at version 1 / DRAFT from creation data.
    pub fn new(data: NewRecord) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            record_code: data.record_code,
            shop_code: data.shop_code,
            current_version: 1,
            status: RecordStatus::Draft,
            description: data.description,
            finalized_at: None,
            finalized_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Data required to create a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    /// Unique business key.
    pub record_code: String,
    /// Grouping key.
    pub shop_code: String,
    /// Optional description.
    pub description: Option<String>,
}
