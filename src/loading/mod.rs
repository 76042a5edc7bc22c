//! Selective graph materialization: load plans, per-call cache, context,
//! and the recursive graph loader

pub mod cache;
pub mod context;
pub mod graph_loader;
pub mod load_plan;

pub use cache::{argument_signature, MaterializationCache};
pub use context::LoadContext;
pub use graph_loader::{GraphLoader, MAX_RELATION_DEPTH};
pub use load_plan::{LoadPath, LoadPlan};
