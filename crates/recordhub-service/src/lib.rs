//! # recordhub-service
//!
//! The versioning engine and its projections.
//!
//! [`VersioningEngine`] owns the lifecycle rules: it computes next
//! versions, enforces the DRAFT → MODIFIED → FINAL state machine,
//! resolves collision-free filenames, and keeps the record store and the
//! blob store consistent with each other, compensating partial side
//! effects on failure. [`RecordQuery`] builds the read-side views:
//! version histories, version listings, and paginated record listings.

pub mod engine;
pub mod filename;
pub mod query;

pub use engine::{UploadParams, UploadPolicy, VersioningEngine};
pub use query::RecordQuery;
