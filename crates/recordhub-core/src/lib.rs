//! # recordhub-core
//!
//! Core crate for RecordHub. Contains the blob store trait,
//! configuration schemas, typed identifiers, pagination types,
//! logging setup, and the unified error system.
//!
//! This crate has **no** internal dependencies on other RecordHub crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
