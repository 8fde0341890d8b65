//! Product record domain entities.

pub mod filter;
pub mod model;
pub mod status;

pub use filter::RecordFilter;
pub use model::{NewRecord, Record};
pub use status::RecordStatus;
