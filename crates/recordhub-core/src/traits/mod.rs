//! Core traits defined in `recordhub-core` and implemented by other crates.

pub mod blob;

pub use blob::BlobStore;
