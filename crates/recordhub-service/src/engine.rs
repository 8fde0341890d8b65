//! The versioning engine — create, modify, attach, finalize, delete.
//!
//! Every mutating operation runs inside one record-store unit of work so
//! the read-version / compute-next / write-back sequence is atomic with
//! respect to concurrent operations on the same record. Revision rows
//! are inserted before their blobs are written, so a lost filename race
//! aborts without touching storage; a blob written for an operation
//! that then fails to commit is compensated with a best-effort delete,
//! so no orphaned blob survives a failed operation.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};

use recordhub_core::error::{AppError, ErrorKind};
use recordhub_core::result::AppResult;
use recordhub_core::config::storage::StorageConfig;
use recordhub_core::traits::BlobStore;
use recordhub_core::types::{RecordId, RevisionId};
use recordhub_entity::record::{NewRecord, Record, RecordStatus};
use recordhub_entity::revision::FileRevision;
use recordhub_store::traits::{RecordStore, RecordUnitOfWork};
use recordhub_storage::{content_digest, record_blob_prefix, revision_blob_path};

use crate::filename;

/// Maximum attempts at filename resolution before giving up with
/// `NameCollision`.
const MAX_FILENAME_ATTEMPTS: u32 = 3;

/// Maximum record code length in characters.
const MAX_RECORD_CODE_LEN: usize = 100;
/// Maximum shop code length in characters.
const MAX_SHOP_CODE_LEN: usize = 50;

/// One uploaded file, as handed over by the request layer.
#[derive(Debug, Clone)]
pub struct UploadParams {
    /// Caller-supplied filename, not yet sanitized.
    pub original_filename: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// File content.
    pub data: Bytes,
    /// Optional note for this upload.
    pub notes: Option<String>,
}

/// Injected upload acceptance policy.
///
/// The request layer validates uploads upstream; the engine re-validates
/// here as a defensive boundary.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Maximum accepted file size in bytes.
    pub max_file_size_bytes: u64,
    /// MIME types accepted for upload.
    pub allowed_mime_types: Vec<String>,
}

impl UploadPolicy {
    /// Build the policy from the storage configuration section.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            allowed_mime_types: config.allowed_mime_types.clone(),
        }
    }

    /// Check an upload against the policy.
    fn validate(&self, upload: &UploadParams) -> AppResult<()> {
        if upload.original_filename.trim().is_empty() {
            return Err(AppError::validation("Filename must not be empty"));
        }
        if upload.data.is_empty() {
            return Err(AppError::validation("No file content provided"));
        }
        if upload.data.len() as u64 > self.max_file_size_bytes {
            return Err(AppError::invalid_file(format!(
                "File exceeds maximum size of {} bytes",
                self.max_file_size_bytes
            )));
        }
        if !self.allowed_mime_types.iter().any(|m| m == &upload.mime_type) {
            return Err(AppError::invalid_file(format!(
                "MIME type '{}' is not accepted",
                upload.mime_type
            )));
        }
        Ok(())
    }
}

/// Orchestrates the record store, filename resolver, and blob store.
#[derive(Clone)]
pub struct VersioningEngine {
    /// Record store — the single source of truth for versions and status.
    store: Arc<dyn RecordStore>,
    /// Blob store — byte storage only, no authority over logical state.
    blobs: Arc<dyn BlobStore>,
    /// Upload acceptance policy.
    policy: UploadPolicy,
}

impl std::fmt::Debug for VersioningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersioningEngine")
            .field("policy", &self.policy)
            .finish()
    }
}

impl VersioningEngine {
    /// Create a new engine.
    pub fn new(store: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>, policy: UploadPolicy) -> Self {
        Self {
            store,
            blobs,
            policy,
        }
    }

    /// Create a new record at version 1 / DRAFT together with its first
    /// revision. Creation and first upload are one atomic step: if any
    /// part fails, no record and no blob survive.
    pub async fn create(
        &self,
        data: NewRecord,
        upload: UploadParams,
    ) -> AppResult<(Record, FileRevision)> {
        validate_new_record(&data)?;
        self.policy.validate(&upload)?;

        let result = self
            .with_name_retries(|| self.try_create(&data, &upload))
            .await?;

        info!(
            record_id = %result.0.id,
            record_code = %result.0.record_code,
            filename = %result.1.filename,
            "Record created at version 1"
        );
        Ok(result)
    }

    async fn try_create(
        &self,
        data: &NewRecord,
        upload: &UploadParams,
    ) -> AppResult<(Record, FileRevision)> {
        let mut uow = self.store.begin().await?;

        if uow.find_by_code(&data.record_code).await?.is_some() {
            return Err(AppError::duplicate_code(format!(
                "Record code '{}' is already in use",
                data.record_code
            )));
        }

        let record = Record::new(data.clone());
        uow.insert_record(&record).await?;

        let revision = self
            .accept_revision(uow.as_mut(), record.id, 1, upload)
            .await?;

        // The record row rolls back with the transaction; the blob is the
        // only side effect to compensate.
        if let Err(e) = uow.commit().await {
            self.discard_blob(&revision.storage_path).await;
            return Err(e);
        }
        Ok((record, revision))
    }

    /// Accept a new revision on an existing record, bumping its version
    /// by exactly one and moving it to MODIFIED.
    pub async fn modify(
        &self,
        record_id: RecordId,
        upload: UploadParams,
    ) -> AppResult<(Record, FileRevision)> {
        self.policy.validate(&upload)?;

        let result = self
            .with_name_retries(|| self.try_modify(record_id, &upload))
            .await?;

        info!(
            %record_id,
            version = result.0.current_version,
            filename = %result.1.filename,
            "Revision accepted"
        );
        Ok(result)
    }

    async fn try_modify(
        &self,
        record_id: RecordId,
        upload: &UploadParams,
    ) -> AppResult<(Record, FileRevision)> {
        let mut uow = self.store.begin().await?;
        let mut record = self.locked_record(uow.as_mut(), record_id).await?;

        if record.status.is_final() {
            return Err(AppError::already_finalized(format!(
                "Record '{}' is finalized and cannot be modified",
                record.record_code
            )));
        }

        let next_version = record.current_version + 1;
        let revision = self
            .accept_revision(uow.as_mut(), record.id, next_version, upload)
            .await?;

        record.current_version = next_version;
        record.status = RecordStatus::Modified;
        record.updated_at = Utc::now();

        if let Err(e) = uow.update_record(&record).await {
            self.discard_blob(&revision.storage_path).await;
            return Err(e);
        }
        if let Err(e) = uow.commit().await {
            self.discard_blob(&revision.storage_path).await;
            return Err(e);
        }
        Ok((record, revision))
    }

    /// Add a further file to the record's *current* version bucket
    /// without bumping the version. This is how several files come to
    /// share one version number.
    pub async fn attach(
        &self,
        record_id: RecordId,
        upload: UploadParams,
    ) -> AppResult<(Record, FileRevision)> {
        self.policy.validate(&upload)?;

        let result = self
            .with_name_retries(|| self.try_attach(record_id, &upload))
            .await?;

        info!(
            %record_id,
            version = result.0.current_version,
            filename = %result.1.filename,
            "File attached to current version"
        );
        Ok(result)
    }

    async fn try_attach(
        &self,
        record_id: RecordId,
        upload: &UploadParams,
    ) -> AppResult<(Record, FileRevision)> {
        let mut uow = self.store.begin().await?;
        let record = self.locked_record(uow.as_mut(), record_id).await?;

        if record.status.is_final() {
            return Err(AppError::already_finalized(format!(
                "Record '{}' is finalized and cannot accept files",
                record.record_code
            )));
        }

        let revision = self
            .accept_revision(uow.as_mut(), record.id, record.current_version, upload)
            .await?;

        if let Err(e) = uow.commit().await {
            self.discard_blob(&revision.storage_path).await;
            return Err(e);
        }
        Ok((record, revision))
    }

    /// Finalize a record. Terminal: no further revisions, version bumps,
    /// or deletion are accepted afterwards.
    pub async fn finalize(
        &self,
        record_id: RecordId,
        finalized_by: &str,
        notes: Option<&str>,
    ) -> AppResult<Record> {
        if finalized_by.trim().is_empty() {
            return Err(AppError::validation("finalized_by must not be empty"));
        }

        let mut uow = self.store.begin().await?;
        let mut record = self.locked_record(uow.as_mut(), record_id).await?;

        if record.status.is_final() {
            return Err(AppError::already_finalized(format!(
                "Record '{}' is already finalized",
                record.record_code
            )));
        }

        let now = Utc::now();
        record.status = RecordStatus::Final;
        record.finalized_at = Some(now);
        record.finalized_by = Some(finalized_by.to_string());
        record.updated_at = now;

        uow.update_record(&record).await?;
        uow.commit().await?;

        info!(
            %record_id,
            finalized_by,
            notes = notes.unwrap_or(""),
            version = record.current_version,
            "Record finalized"
        );
        Ok(record)
    }

    /// Delete a record and all its revisions. Forbidden once finalized.
    ///
    /// The record store is authoritative, so its rows are removed first;
    /// blob deletes afterwards are best effort and merely logged on
    /// failure.
    pub async fn delete(&self, record_id: RecordId) -> AppResult<()> {
        let mut uow = self.store.begin().await?;
        let record = self.locked_record(uow.as_mut(), record_id).await?;

        if record.status.is_final() {
            return Err(AppError::forbidden(format!(
                "Record '{}' is finalized and cannot be deleted",
                record.record_code
            )));
        }

        let revisions = uow.delete_record(record_id).await?;
        uow.commit().await?;

        for revision in &revisions {
            if let Err(e) = self.blobs.delete(&revision.storage_path).await {
                warn!(
                    revision_id = %revision.id,
                    path = %revision.storage_path,
                    error = %e,
                    "Failed to delete blob during cascade delete"
                );
            }
        }
        if let Err(e) = self.blobs.delete_prefix(&record_blob_prefix(record_id)).await {
            warn!(%record_id, error = %e, "Failed to remove record blob directory");
        }

        info!(%record_id, revisions = revisions.len(), "Record deleted");
        Ok(())
    }

    /// Delete a single revision. Forbidden once the owning record is
    /// finalized.
    pub async fn delete_revision(&self, revision_id: RevisionId) -> AppResult<()> {
        let revision = self
            .store
            .find_revision(revision_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Revision {revision_id} not found")))?;

        let mut uow = self.store.begin().await?;
        let record = self.locked_record(uow.as_mut(), revision.record_id).await?;

        if record.status.is_final() {
            return Err(AppError::forbidden(format!(
                "Record '{}' is finalized; its revisions cannot be deleted",
                record.record_code
            )));
        }

        uow.delete_revision(revision_id).await?;
        uow.commit().await?;

        if let Err(e) = self.blobs.delete(&revision.storage_path).await {
            warn!(
                %revision_id,
                path = %revision.storage_path,
                error = %e,
                "Failed to delete blob for removed revision"
            );
        }

        info!(%revision_id, record_id = %revision.record_id, "Revision deleted");
        Ok(())
    }

    /// Fetch a record by id.
    pub async fn get(&self, record_id: RecordId) -> AppResult<Record> {
        self.store
            .find_record(record_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Record {record_id} not found")))
    }

    /// Fetch a record by its business code.
    pub async fn get_by_code(&self, record_code: &str) -> AppResult<Record> {
        self.store
            .find_by_code(record_code)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Record with code '{record_code}' not found"))
            })
    }

    /// Read a revision's metadata and blob bytes back.
    pub async fn read_revision(&self, revision_id: RevisionId) -> AppResult<(FileRevision, Bytes)> {
        let revision = self
            .store
            .find_revision(revision_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Revision {revision_id} not found")))?;
        let data = self.blobs.get(&revision.storage_path).await?;
        Ok((revision, data))
    }

    /// Run one accept-revision attempt inside an open unit of work:
    /// resolve a collision-free filename against the bucket, insert the
    /// revision row, then write the blob.
    ///
    /// The row goes first. Its `(record_id, version, filename)` insert
    /// claims the storage path, so a lost filename race surfaces as
    /// `Conflict` before any bytes land on disk and the blob of the
    /// revision that won the name is never touched. A failed blob write
    /// afterwards rolls back with the unit of work.
    async fn accept_revision(
        &self,
        uow: &mut dyn RecordUnitOfWork,
        record_id: RecordId,
        version: i32,
        upload: &UploadParams,
    ) -> AppResult<FileRevision> {
        let desired = filename::sanitize_filename(upload.original_filename.trim());
        let bucket = uow.bucket_filenames(record_id, version).await?;
        let resolved = filename::resolve_filename(&bucket, &desired);
        let storage_path = revision_blob_path(record_id, version, &resolved);

        let revision = FileRevision {
            id: RevisionId::new(),
            record_id,
            version,
            filename: resolved,
            storage_path: storage_path.clone(),
            file_size_bytes: upload.data.len() as i64,
            mime_type: upload.mime_type.clone(),
            extension: filename::extension_of(&desired),
            content_hash: Some(content_digest(&upload.data)),
            notes: upload.notes.clone(),
            created_at: Utc::now(),
        };

        uow.insert_revision(&revision).await?;
        self.blobs.put(&storage_path, upload.data.clone()).await?;
        Ok(revision)
    }

    /// Retry an operation whose unit of work lost a filename race.
    ///
    /// A `Conflict` from the store means another upload claimed the
    /// resolved name between our bucket snapshot and our insert; the
    /// whole unit of work is retried against the now-current bucket, a
    /// bounded number of times.
    async fn with_name_retries<T, F, Fut>(&self, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        for attempt in 1..=MAX_FILENAME_ATTEMPTS {
            match op().await {
                Err(e) if e.is_kind(ErrorKind::Conflict) => {
                    debug!(attempt, "Filename resolution lost a race, retrying");
                }
                other => return other,
            }
        }
        Err(AppError::name_collision(format!(
            "Exhausted {MAX_FILENAME_ATTEMPTS} filename resolution attempts"
        )))
    }

    /// Fetch a record for update or fail with `NotFound`.
    async fn locked_record(
        &self,
        uow: &mut dyn RecordUnitOfWork,
        record_id: RecordId,
    ) -> AppResult<Record> {
        uow.find_record_for_update(record_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Record {record_id} not found")))
    }

    /// Remove a blob written by a failed operation. Best effort.
    async fn discard_blob(&self, storage_path: &str) {
        if let Err(e) = self.blobs.delete(storage_path).await {
            warn!(path = %storage_path, error = %e, "Failed to discard blob after rollback");
        }
    }
}

/// Validate record creation input.
fn validate_new_record(data: &NewRecord) -> AppResult<()> {
    let code_len = data.record_code.chars().count();
    if code_len == 0 || code_len > MAX_RECORD_CODE_LEN {
        return Err(AppError::validation(format!(
            "record_code must be 1-{MAX_RECORD_CODE_LEN} characters"
        )));
    }
    let shop_len = data.shop_code.chars().count();
    if shop_len == 0 || shop_len > MAX_SHOP_CODE_LEN {
        return Err(AppError::validation(format!(
            "shop_code must be 1-{MAX_SHOP_CODE_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UploadPolicy {
        UploadPolicy::from_config(&StorageConfig::default())
    }

    fn upload(name: &str, mime: &str, bytes: &'static [u8]) -> UploadParams {
        UploadParams {
            original_filename: name.to_string(),
            mime_type: mime.to_string(),
            data: Bytes::from_static(bytes),
            notes: None,
        }
    }

    #[test]
    fn test_policy_rejects_oversized_file() {
        let policy = UploadPolicy {
            max_file_size_bytes: 4,
            allowed_mime_types: vec!["application/pdf".to_string()],
        };
        let err = policy
            .validate(&upload("a.pdf", "application/pdf", b"12345"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFile);
    }

    #[test]
    fn test_policy_rejects_unlisted_mime_type() {
        let err = policy()
            .validate(&upload("a.gif", "image/gif", b"data"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFile);
    }

    #[test]
    fn test_policy_rejects_empty_upload() {
        let err = policy()
            .validate(&upload("a.pdf", "application/pdf", b""))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = policy()
            .validate(&upload("  ", "application/pdf", b"data"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_validate_new_record_lengths() {
        let ok = NewRecord {
            record_code: "A-1".to_string(),
            shop_code: "S".to_string(),
            description: None,
        };
        assert!(validate_new_record(&ok).is_ok());

        let too_long = NewRecord {
            record_code: "x".repeat(101),
            shop_code: "S".to_string(),
            description: None,
        };
        assert_eq!(
            validate_new_record(&too_long).unwrap_err().kind,
            ErrorKind::Validation
        );

        let empty_shop = NewRecord {
            record_code: "A-1".to_string(),
            shop_code: String::new(),
            description: None,
        };
        assert_eq!(
            validate_new_record(&empty_shop).unwrap_err().kind,
            ErrorKind::Validation
        );
    }
}
