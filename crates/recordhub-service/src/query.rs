//! Read-side projections over the record store.

use std::collections::BTreeMap;
use std::sync::Arc;

use recordhub_core::result::AppResult;
use recordhub_core::types::pagination::{PageRequest, PageResponse};
use recordhub_core::types::RecordId;
use recordhub_core::AppError;
use recordhub_entity::record::{Record, RecordFilter};
use recordhub_entity::revision::{FileRevision, VersionGroup};
use recordhub_store::traits::RecordStore;

/// Read-only query facade for records and their revisions.
#[derive(Clone)]
pub struct RecordQuery {
    store: Arc<dyn RecordStore>,
}

impl RecordQuery {
    /// Create a new query facade.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// List records matching the filter, newest first, paginated.
    pub async fn list(
        &self,
        filter: &RecordFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Record>> {
        let (items, total) = self.store.list_records(filter, page).await?;
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    /// The full revision history of a record, ordered by version then
    /// upload time, both ascending.
    pub async fn version_history(&self, record_id: RecordId) -> AppResult<Vec<FileRevision>> {
        self.require_record(record_id).await?;
        self.store.list_revisions(record_id, None).await
    }

    /// Revisions grouped into version buckets, newest version first.
    pub async fn list_versions(&self, record_id: RecordId) -> AppResult<Vec<VersionGroup>> {
        self.require_record(record_id).await?;
        let revisions = self.store.list_revisions(record_id, None).await?;

        let mut buckets: BTreeMap<i32, Vec<FileRevision>> = BTreeMap::new();
        for revision in revisions {
            buckets.entry(revision.version).or_default().push(revision);
        }

        Ok(buckets
            .into_iter()
            .rev()
            .map(|(version, files)| VersionGroup::new(version, files))
            .collect())
    }

    /// The files of a single version bucket, ordered by upload time.
    pub async fn get_files(&self, record_id: RecordId, version: i32) -> AppResult<Vec<FileRevision>> {
        self.require_record(record_id).await?;
        self.store.list_revisions(record_id, Some(version)).await
    }

    async fn require_record(&self, record_id: RecordId) -> AppResult<Record> {
        self.store
            .find_record(record_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Record {record_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use recordhub_core::error::ErrorKind;
    use recordhub_core::types::RevisionId;
    use recordhub_entity::record::NewRecord;
    use recordhub_store::memory::MemoryRecordStore;

    use super::*;

    async fn seeded_store() -> (Arc<MemoryRecordStore>, Record) {
        let store = Arc::new(MemoryRecordStore::new());
        let record = Record::new(NewRecord {
            record_code: "A-1".to_string(),
            shop_code: "S-01".to_string(),
            description: None,
        });

        let base = Utc::now();
        let mut uow = store.begin().await.unwrap();
        uow.insert_record(&record).await.unwrap();
        for (i, (version, filename)) in [(1, "a.pdf"), (2, "b.pdf"), (2, "c.pdf")]
            .into_iter()
            .enumerate()
        {
            let revision = FileRevision {
                id: RevisionId::new(),
                record_id: record.id,
                version,
                filename: filename.to_string(),
                storage_path: format!("records/{}/v{}/{}", record.id, version, filename),
                file_size_bytes: 4,
                mime_type: "application/pdf".to_string(),
                extension: "pdf".to_string(),
                content_hash: None,
                notes: None,
                created_at: base + Duration::seconds(i as i64),
            };
            uow.insert_revision(&revision).await.unwrap();
        }
        uow.commit().await.unwrap();
        (store, record)
    }

    #[tokio::test]
    async fn test_version_history_is_ascending() {
        let (store, record) = seeded_store().await;
        let query = RecordQuery::new(store);

        let history = query.version_history(record.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.iter().map(|r| r.version).collect::<Vec<_>>(),
            vec![1, 2, 2]
        );
        assert_eq!(history[1].filename, "b.pdf");
        assert_eq!(history[2].filename, "c.pdf");
    }

    #[tokio::test]
    async fn test_list_versions_groups_newest_first() {
        let (store, record) = seeded_store().await;
        let query = RecordQuery::new(store);

        let groups = query.list_versions(record.id).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].version, 2);
        assert_eq!(groups[0].file_count, 2);
        assert_eq!(groups[1].version, 1);
        assert_eq!(groups[1].file_count, 1);
        assert_eq!(
            groups[0].earliest_upload_at,
            Some(groups[0].files[0].created_at)
        );
    }

    #[tokio::test]
    async fn test_get_files_filters_by_version() {
        let (store, record) = seeded_store().await;
        let query = RecordQuery::new(store);

        let files = query.get_files(record.id, 2).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.version == 2));

        let files = query.get_files(record.id, 3).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let (store, _) = seeded_store().await;
        let query = RecordQuery::new(store);

        let err = query.version_history(RecordId::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
