//! # recordhub-store
//!
//! The record store contract and its implementations.
//!
//! The record store is the single source of truth for record versions and
//! statuses. It owns the uniqueness constraints (`record_code` across
//! records, `(record_id, version, filename)` across revisions) and
//! provides the transactional unit-of-work that scopes every mutating
//! engine operation. Two implementations exist: a PostgreSQL store over
//! sqlx and an in-memory store for tests and single-node use.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
pub use traits::{RecordStore, RecordUnitOfWork};
