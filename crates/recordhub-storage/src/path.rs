//! Blob path derivation.
//!
//! Blobs are namespaced by record: `records/<record_id>/v<version>/<filename>`.
//! Two different records may legitimately resolve the same filename under
//! the same version number, so the record id is part of the path and path
//! collision-freedom coincides with the `(record_id, version, filename)`
//! uniqueness constraint in the record store.

use recordhub_core::types::RecordId;

/// Derive the canonical blob path for a revision.
pub fn revision_blob_path(record_id: RecordId, version: i32, filename: &str) -> String {
    format!("records/{record_id}/v{version}/{filename}")
}

/// Derive the path prefix holding every blob of a record.
pub fn record_blob_prefix(record_id: RecordId) -> String {
    format!("records/{record_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_shape() {
        let id = RecordId::new();
        let path = revision_blob_path(id, 3, "report.pdf");
        assert_eq!(path, format!("records/{id}/v3/report.pdf"));
        assert!(path.starts_with(&record_blob_prefix(id)));
    }
}
