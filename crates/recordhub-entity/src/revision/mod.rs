//! File revision domain entities.

pub mod group;
pub mod model;

pub use group::VersionGroup;
pub use model::FileRevision;
