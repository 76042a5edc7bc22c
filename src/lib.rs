//! sproc-orm - Stored-procedure data access with selective graph
//! materialization
//!
//! Entities are hydrated from stored-procedure result rows. Relations
//! between entities are declared as metadata and materialized on demand: a
//! caller supplies a [`LoadPlan`](loading::LoadPlan) naming the relation
//! paths to resolve eagerly, and the graph loader walks those paths
//! recursively, deduplicating identical loads through a per-call cache and
//! routing each relation to its registered loader.
//!
//! ```ignore
//! let mut factory = Factory::<Order>::new("main")?;
//! let mut plan = LoadPlan::new();
//! plan.add_path("Order", "Customer")?;
//! factory.set_load_plan(Some(plan));
//! let orders = factory.map_all("get_open_orders", None, None)?;
//! ```

pub mod backends;
pub mod database;
pub mod error;
pub mod factory;
pub mod hydration;
pub mod loading;
pub mod model;
pub mod parameters;
pub mod relationships;
pub mod repository;
pub mod transaction;

#[cfg(test)]
mod tests;

pub use backends::{MemoryDatabase, Row, SharedConnection};
pub use database::{register_backend, register_connection, Command, ConnectionConfig, DatabaseProvider};
pub use error::{OrmError, OrmResult};
pub use factory::{Factory, Page};
pub use hydration::{hydrate, hydrate_all};
pub use loading::{LoadContext, LoadPath, LoadPlan};
pub use model::{register_entity, DescriptorBuilder, Entity, EntityDescriptor, RelatedValue};
pub use parameters::{Parameter, ParameterDirection, ParameterSet};
pub use relationships::{register_loader, RelationLoader, RelationMetadata};
pub use repository::Repository;
pub use transaction::TransactionManager;
