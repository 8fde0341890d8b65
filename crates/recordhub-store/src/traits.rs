//! Record store contract.

use std::collections::HashSet;

use async_trait::async_trait;

use recordhub_core::result::AppResult;
use recordhub_core::types::pagination::PageRequest;
use recordhub_core::types::{RecordId, RevisionId};
use recordhub_entity::record::{Record, RecordFilter};
use recordhub_entity::revision::FileRevision;

/// Transactional store for records and their file revisions.
///
/// Read-only queries run outside any transaction. Every mutating engine
/// operation obtains a [`RecordUnitOfWork`] via [`RecordStore::begin`] so
/// that its read-version / compute-next / write-back sequence is atomic
/// with respect to concurrent operations on the same record.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Open a unit of work. Dropping the returned handle without calling
    /// `commit` rolls back every buffered write.
    async fn begin(&self) -> AppResult<Box<dyn RecordUnitOfWork>>;

    /// Find a record by id.
    async fn find_record(&self, id: RecordId) -> AppResult<Option<Record>>;

    /// Find a record by its business code (case-sensitive exact match).
    async fn find_by_code(&self, record_code: &str) -> AppResult<Option<Record>>;

    /// Find a file revision by id.
    async fn find_revision(&self, id: RevisionId) -> AppResult<Option<FileRevision>>;

    /// List the revisions of a record, optionally restricted to one
    /// version, ordered by version then upload time ascending.
    async fn list_revisions(
        &self,
        record_id: RecordId,
        version: Option<i32>,
    ) -> AppResult<Vec<FileRevision>>;

    /// List records matching the filter, newest first, with the total
    /// match count.
    async fn list_records(
        &self,
        filter: &RecordFilter,
        page: &PageRequest,
    ) -> AppResult<(Vec<Record>, u64)>;
}

/// A transactional unit of work over the record store.
///
/// All writes are buffered until [`RecordUnitOfWork::commit`]; the handle
/// holds whatever lock the backing store needs to serialize concurrent
/// mutations of the same record (a row lock in PostgreSQL, the store
/// mutex in memory).
#[async_trait]
pub trait RecordUnitOfWork: Send {
    /// Fetch a record for update, taking the serializing lock on it.
    async fn find_record_for_update(&mut self, id: RecordId) -> AppResult<Option<Record>>;

    /// Find a record by business code inside this transaction.
    async fn find_by_code(&mut self, record_code: &str) -> AppResult<Option<Record>>;

    /// Return the set of filenames already present in the
    /// `(record_id, version)` bucket.
    async fn bucket_filenames(
        &mut self,
        record_id: RecordId,
        version: i32,
    ) -> AppResult<HashSet<String>>;

    /// Insert a new record. Fails with `DuplicateCode` if the business
    /// code is already taken.
    async fn insert_record(&mut self, record: &Record) -> AppResult<()>;

    /// Update an existing record row.
    async fn update_record(&mut self, record: &Record) -> AppResult<()>;

    /// Insert a new file revision. Fails with `Conflict` if the
    /// `(record_id, version, filename)` triple is already taken.
    async fn insert_revision(&mut self, revision: &FileRevision) -> AppResult<()>;

    /// Delete a single revision row.
    async fn delete_revision(&mut self, id: RevisionId) -> AppResult<()>;

    /// Delete a record and all its revisions, returning the deleted
    /// revisions so the caller can clean up their blobs.
    async fn delete_record(&mut self, id: RecordId) -> AppResult<Vec<FileRevision>>;

    /// Commit all buffered writes.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}
