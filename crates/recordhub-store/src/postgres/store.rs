//! PostgreSQL implementation of the record store contract.
//!
//! Concurrent mutations of the same record serialize on a
//! `SELECT ... FOR UPDATE` row lock taken at the start of every unit of
//! work. The unique constraints declared in the migrations are the final
//! arbiter for record codes and bucket filenames; constraint violations
//! surface as `DuplicateCode` and `Conflict` respectively.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder, Transaction};

use recordhub_core::error::{AppError, ErrorKind};
use recordhub_core::result::AppResult;
use recordhub_core::types::pagination::PageRequest;
use recordhub_core::types::{RecordId, RevisionId};
use recordhub_entity::record::{Record, RecordFilter};
use recordhub_entity::revision::FileRevision;

use crate::traits::{RecordStore, RecordUnitOfWork};

/// Constraint name guarding record code uniqueness.
const RECORD_CODE_CONSTRAINT: &str = "records_record_code_key";
/// Constraint name guarding `(record_id, version, filename)` uniqueness.
const BUCKET_FILENAME_CONSTRAINT: &str = "file_revisions_record_version_filename_key";

/// PostgreSQL-backed record store.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a sqlx error from an insert, translating unique violations into
/// the domain error kinds the engine understands.
fn map_insert_error(e: sqlx::Error, context: &str) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        match db.constraint() {
            Some(RECORD_CODE_CONSTRAINT) => {
                return AppError::duplicate_code("Record code is already in use");
            }
            Some(BUCKET_FILENAME_CONSTRAINT) => {
                return AppError::conflict("Filename already exists in this version bucket");
            }
            _ => {}
        }
    }
    AppError::with_source(ErrorKind::Database, context.to_string(), e)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn begin(&self) -> AppResult<Box<dyn RecordUnitOfWork>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn find_record(&self, id: RecordId) -> AppResult<Option<Record>> {
        sqlx::query_as::<_, Record>("SELECT * FROM records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find record", e))
    }

    async fn find_by_code(&self, record_code: &str) -> AppResult<Option<Record>> {
        sqlx::query_as::<_, Record>("SELECT * FROM records WHERE record_code = $1")
            .bind(record_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find record by code", e)
            })
    }

    async fn find_revision(&self, id: RevisionId) -> AppResult<Option<FileRevision>> {
        sqlx::query_as::<_, FileRevision>("SELECT * FROM file_revisions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find revision", e))
    }

    async fn list_revisions(
        &self,
        record_id: RecordId,
        version: Option<i32>,
    ) -> AppResult<Vec<FileRevision>> {
        let revisions = match version {
            Some(v) => {
                sqlx::query_as::<_, FileRevision>(
                    "SELECT * FROM file_revisions WHERE record_id = $1 AND version = $2 \
                     ORDER BY version ASC, created_at ASC",
                )
                .bind(record_id)
                .bind(v)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, FileRevision>(
                    "SELECT * FROM file_revisions WHERE record_id = $1 \
                     ORDER BY version ASC, created_at ASC",
                )
                .bind(record_id)
                .fetch_all(&self.pool)
                .await
            }
        };
        revisions
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list revisions", e))
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
        page: &PageRequest,
    ) -> AppResult<(Vec<Record>, u64)> {
        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM records WHERE 1=1");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count records", e)
            })?;

        let mut list_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM records WHERE 1=1");
        push_filter(&mut list_query, filter);
        list_query.push(" ORDER BY created_at DESC, record_code DESC LIMIT ");
        list_query.push_bind(page.limit() as i64);
        list_query.push(" OFFSET ");
        list_query.push_bind(page.offset() as i64);

        let records = list_query
            .build_query_as::<Record>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list records", e)
            })?;

        Ok((records, total as u64))
    }
}

/// Append the ANDed filter conditions to a query.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    if let Some(shop_code) = &filter.shop_code {
        query.push(" AND shop_code = ");
        query.push_bind(shop_code.clone());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ");
        query.push_bind(status);
    }
    if let Some(term) = &filter.search {
        query.push(" AND record_code LIKE ");
        query.push_bind(format!("%{term}%"));
    }
}

/// Unit of work over a PostgreSQL transaction.
struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RecordUnitOfWork for PgUnitOfWork {
    async fn find_record_for_update(&mut self, id: RecordId) -> AppResult<Option<Record>> {
        sqlx::query_as::<_, Record>("SELECT * FROM records WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock record for update", e)
            })
    }

    async fn find_by_code(&mut self, record_code: &str) -> AppResult<Option<Record>> {
        sqlx::query_as::<_, Record>("SELECT * FROM records WHERE record_code = $1")
            .bind(record_code)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find record by code", e)
            })
    }

    async fn bucket_filenames(
        &mut self,
        record_id: RecordId,
        version: i32,
    ) -> AppResult<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT filename FROM file_revisions WHERE record_id = $1 AND version = $2",
        )
        .bind(record_id)
        .bind(version)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to read bucket filenames", e)
        })?;
        Ok(names.into_iter().collect())
    }

    async fn insert_record(&mut self, record: &Record) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO records (id, record_code, shop_code, current_version, status, \
             description, finalized_at, finalized_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.id)
        .bind(&record.record_code)
        .bind(&record.shop_code)
        .bind(record.current_version)
        .bind(record.status)
        .bind(&record.description)
        .bind(record.finalized_at)
        .bind(&record.finalized_by)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_insert_error(e, "Failed to insert record"))?;
        Ok(())
    }

    async fn update_record(&mut self, record: &Record) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE records SET record_code = $2, shop_code = $3, current_version = $4, \
             status = $5, description = $6, finalized_at = $7, finalized_by = $8, \
             updated_at = $9 WHERE id = $1",
        )
        .bind(record.id)
        .bind(&record.record_code)
        .bind(&record.shop_code)
        .bind(record.current_version)
        .bind(record.status)
        .bind(&record.description)
        .bind(record.finalized_at)
        .bind(&record.finalized_by)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update record", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Record {} not found", record.id)));
        }
        Ok(())
    }

    async fn insert_revision(&mut self, revision: &FileRevision) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO file_revisions (id, record_id, version, filename, storage_path, \
             file_size_bytes, mime_type, extension, content_hash, notes, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(revision.id)
        .bind(revision.record_id)
        .bind(revision.version)
        .bind(&revision.filename)
        .bind(&revision.storage_path)
        .bind(revision.file_size_bytes)
        .bind(&revision.mime_type)
        .bind(&revision.extension)
        .bind(&revision.content_hash)
        .bind(&revision.notes)
        .bind(revision.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_insert_error(e, "Failed to insert revision"))?;
        Ok(())
    }

    async fn delete_revision(&mut self, id: RevisionId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM file_revisions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete revision", e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Revision {id} not found")));
        }
        Ok(())
    }

    async fn delete_record(&mut self, id: RecordId) -> AppResult<Vec<FileRevision>> {
        let revisions = sqlx::query_as::<_, FileRevision>(
            "SELECT * FROM file_revisions WHERE record_id = $1 \
             ORDER BY version ASC, created_at ASC",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to collect revisions", e)
        })?;

        // Revisions cascade via the foreign key.
        let result = sqlx::query("DELETE FROM records WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete record", e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Record {id} not found")));
        }
        Ok(revisions)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })
    }
}
