//! In-memory record store for tests and single-node use.
//!
//! The whole store sits behind one Tokio mutex. A unit of work takes the
//! owned guard for its entire lifetime, which serializes concurrent
//! mutations (the memory analogue of row-level locking), and applies its
//! writes to a working copy that replaces the shared state on commit.
//! Dropping the unit of work discards the working copy.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use recordhub_core::result::AppResult;
use recordhub_core::types::pagination::PageRequest;
use recordhub_core::types::{RecordId, RevisionId};
use recordhub_core::AppError;
use recordhub_entity::record::{Record, RecordFilter};
use recordhub_entity::revision::FileRevision;

use crate::traits::{RecordStore, RecordUnitOfWork};

/// Shared store contents.
#[derive(Debug, Default, Clone)]
struct State {
    /// Records by id.
    records: HashMap<Uuid, Record>,
    /// Revisions by id.
    revisions: HashMap<Uuid, FileRevision>,
}

/// In-memory record store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    state: Arc<Mutex<State>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_by_code_in(state: &State, record_code: &str) -> Option<Record> {
    state
        .records
        .values()
        .find(|r| r.record_code == record_code)
        .cloned()
}

fn list_revisions_in(
    state: &State,
    record_id: RecordId,
    version: Option<i32>,
) -> Vec<FileRevision> {
    let mut revisions: Vec<FileRevision> = state
        .revisions
        .values()
        .filter(|r| r.record_id == record_id && version.is_none_or(|v| r.version == v))
        .cloned()
        .collect();
    revisions.sort_by(|a, b| {
        a.version
            .cmp(&b.version)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    revisions
}

fn list_records_in(state: &State, filter: &RecordFilter, page: &PageRequest) -> (Vec<Record>, u64) {
    let mut matches: Vec<Record> = state
        .records
        .values()
        .filter(|r| {
            filter
                .shop_code
                .as_ref()
                .is_none_or(|shop| &r.shop_code == shop)
                && filter.status.is_none_or(|status| r.status == status)
                && filter
                    .search
                    .as_ref()
                    .is_none_or(|term| r.record_code.contains(term.as_str()))
        })
        .cloned()
        .collect();

    // Newest first, record code as a stable tiebreaker.
    matches.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.record_code.cmp(&a.record_code))
    });

    let total = matches.len() as u64;
    let items = matches
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (items, total)
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn begin(&self) -> AppResult<Box<dyn RecordUnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn find_record(&self, id: RecordId) -> AppResult<Option<Record>> {
        let state = self.state.lock().await;
        Ok(state.records.get(id.as_uuid()).cloned())
    }

    async fn find_by_code(&self, record_code: &str) -> AppResult<Option<Record>> {
        let state = self.state.lock().await;
        Ok(find_by_code_in(&state, record_code))
    }

    async fn find_revision(&self, id: RevisionId) -> AppResult<Option<FileRevision>> {
        let state = self.state.lock().await;
        Ok(state.revisions.get(id.as_uuid()).cloned())
    }

    async fn list_revisions(
        &self,
        record_id: RecordId,
        version: Option<i32>,
    ) -> AppResult<Vec<FileRevision>> {
        let state = self.state.lock().await;
        Ok(list_revisions_in(&state, record_id, version))
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
        page: &PageRequest,
    ) -> AppResult<(Vec<Record>, u64)> {
        let state = self.state.lock().await;
        Ok(list_records_in(&state, filter, page))
    }
}

/// Unit of work over the in-memory store.
struct MemoryUnitOfWork {
    /// Holds the store mutex for the lifetime of the transaction.
    guard: OwnedMutexGuard<State>,
    /// Working copy receiving buffered writes.
    working: State,
}

#[async_trait]
impl RecordUnitOfWork for MemoryUnitOfWork {
    async fn find_record_for_update(&mut self, id: RecordId) -> AppResult<Option<Record>> {
        Ok(self.working.records.get(id.as_uuid()).cloned())
    }

    async fn find_by_code(&mut self, record_code: &str) -> AppResult<Option<Record>> {
        Ok(find_by_code_in(&self.working, record_code))
    }

    async fn bucket_filenames(
        &mut self,
        record_id: RecordId,
        version: i32,
    ) -> AppResult<HashSet<String>> {
        Ok(self
            .working
            .revisions
            .values()
            .filter(|r| r.record_id == record_id && r.version == version)
            .map(|r| r.filename.clone())
            .collect())
    }

    async fn insert_record(&mut self, record: &Record) -> AppResult<()> {
        if find_by_code_in(&self.working, &record.record_code).is_some() {
            return Err(AppError::duplicate_code(format!(
                "Record code '{}' is already in use",
                record.record_code
            )));
        }
        self.working
            .records
            .insert(record.id.into_uuid(), record.clone());
        Ok(())
    }

    async fn update_record(&mut self, record: &Record) -> AppResult<()> {
        if !self.working.records.contains_key(record.id.as_uuid()) {
            return Err(AppError::not_found(format!("Record {} not found", record.id)));
        }
        self.working
            .records
            .insert(record.id.into_uuid(), record.clone());
        Ok(())
    }

    async fn insert_revision(&mut self, revision: &FileRevision) -> AppResult<()> {
        let taken = self.working.revisions.values().any(|r| {
            r.record_id == revision.record_id
                && r.version == revision.version
                && r.filename == revision.filename
        });
        if taken {
            return Err(AppError::conflict(format!(
                "Filename '{}' already exists in version {} of record {}",
                revision.filename, revision.version, revision.record_id
            )));
        }
        self.working
            .revisions
            .insert(revision.id.into_uuid(), revision.clone());
        Ok(())
    }

    async fn delete_revision(&mut self, id: RevisionId) -> AppResult<()> {
        self.working
            .revisions
            .remove(id.as_uuid())
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("Revision {id} not found")))
    }

    async fn delete_record(&mut self, id: RecordId) -> AppResult<Vec<FileRevision>> {
        if self.working.records.remove(id.as_uuid()).is_none() {
            return Err(AppError::not_found(format!("Record {id} not found")));
        }
        let removed = list_revisions_in(&self.working, id, None);
        self.working.revisions.retain(|_, r| r.record_id != id);
        Ok(removed)
    }

    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        *self.guard = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use recordhub_core::error::ErrorKind;
    use recordhub_entity::record::{NewRecord, RecordStatus};

    use super::*;

    fn sample_record(code: &str) -> Record {
        Record::new(NewRecord {
            record_code: code.to_string(),
            shop_code: "S-01".to_string(),
            description: None,
        })
    }

    fn sample_revision(record: &Record, version: i32, filename: &str) -> FileRevision {
        FileRevision {
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
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let store = MemoryRecordStore::new();
        let record = sample_record("A-1");

        let mut uow = store.begin().await.unwrap();
        uow.insert_record(&record).await.unwrap();
        uow.commit().await.unwrap();

        let found = store.find_record(record.id).await.unwrap().unwrap();
        assert_eq!(found.record_code, "A-1");
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = MemoryRecordStore::new();
        let record = sample_record("A-2");

        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_record(&record).await.unwrap();
            // dropped without commit
        }

        assert!(store.find_record(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let store = MemoryRecordStore::new();

        let mut uow = store.begin().await.unwrap();
        uow.insert_record(&sample_record("A-3")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let err = uow.insert_record(&sample_record("A-3")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateCode);
    }

    #[tokio::test]
    async fn test_revision_triple_uniqueness() {
        let store = MemoryRecordStore::new();
        let record = sample_record("A-4");

        let mut uow = store.begin().await.unwrap();
        uow.insert_record(&record).await.unwrap();
        uow.insert_revision(&sample_revision(&record, 1, "report.pdf"))
            .await
            .unwrap();

        let err = uow
            .insert_revision(&sample_revision(&record, 1, "report.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        // Same filename in a different version bucket is fine.
        uow.insert_revision(&sample_revision(&record, 2, "report.pdf"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_record_returns_cascaded_revisions() {
        let store = MemoryRecordStore::new();
        let record = sample_record("A-5");

        let mut uow = store.begin().await.unwrap();
        uow.insert_record(&record).await.unwrap();
        uow.insert_revision(&sample_revision(&record, 1, "a.pdf"))
            .await
            .unwrap();
        uow.insert_revision(&sample_revision(&record, 2, "b.pdf"))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let removed = uow.delete_record(record.id).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(removed.len(), 2);
        assert!(store.find_record(record.id).await.unwrap().is_none());
        assert!(store
            .list_revisions(record.id, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_list_records_filters_and_counts() {
        let store = MemoryRecordStore::new();
        let mut uow = store.begin().await.unwrap();
        for i in 0..5 {
            let mut record = sample_record(&format!("CODE-{i}"));
            if i >= 3 {
                record.status = RecordStatus::Modified;
            }
            uow.insert_record(&record).await.unwrap();
        }
        uow.commit().await.unwrap();

        let filter = RecordFilter {
            status: Some(RecordStatus::Modified),
            ..Default::default()
        };
        let (items, total) = store
            .list_records(&filter, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 2);

        let filter = RecordFilter {
            search: Some("ODE-1".to_string()),
            ..Default::default()
        };
        let (items, total) = store
            .list_records(&filter, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].record_code, "CODE-1");
    }
}
