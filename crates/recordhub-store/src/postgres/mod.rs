//! PostgreSQL record store implementation.

pub mod connection;
pub mod migration;
pub mod store;

pub use connection::StorePool;
pub use store::PgRecordStore;
