//! # recordhub-entity
//!
//! Domain entity models for RecordHub. Every struct in this crate
//! represents a record store row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and store-backed
//! entities additionally derive `sqlx::FromRow`.

pub mod record;
pub mod revision;
