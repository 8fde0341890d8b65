//! Listing filter for product records.

use serde::{Deserialize, Serialize};

use super::status::RecordStatus;

/// Filter conditions for record listings. All present conditions are
/// ANDed together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Exact match on the shop code.
    pub shop_code: Option<String>,
    /// Exact match on the lifecycle status.
    pub status: Option<RecordStatus>,
    /// Case-sensitive substring match against the record code.
    pub search: Option<String>,
}

impl RecordFilter {
    /// Whether no conditions are set.
    pub fn is_empty(&self) -> bool {
        self.shop_code.is_none() && self.status.is_none() && self.search.is_none()
    }
}
