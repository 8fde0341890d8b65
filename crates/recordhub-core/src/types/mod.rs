//! Shared value types used across RecordHub crates.

pub mod id;
pub mod pagination;

pub use id::{RecordId, RevisionId};
pub use pagination::{PageRequest, PageResponse};
