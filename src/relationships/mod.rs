//! Relation metadata and loader plumbing

pub mod loader;
pub mod metadata;

pub use loader::{create_loader, register_loader, RelationLoader};
pub use metadata::RelationMetadata;
