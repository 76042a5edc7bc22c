//! Relation loaders and their global factory registry
//!
//! A loader materializes related entities for one entity type. Loaders are
//! created per call tree from registered factories, so every loader shares
//! the call's connection and cache through the [`LoadContext`] it is built
//! with. One loader instance is reused for all relations targeting the same
//! type within a call.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{OrmError, OrmResult};
use crate::loading::{LoadContext, LoadPlan};
use crate::model::RelatedValue;

/// Materializes related entities for one target type
pub trait RelationLoader {
    /// Plan governing which relations the loader materializes on the
    /// entities it produces. `None` means load no relations.
    fn set_load_plan(&mut self, plan: Option<LoadPlan>);

    /// Invoke a loader method by name with positional arguments.
    ///
    /// Unknown methods return [`OrmError::MethodNotFound`].
    fn invoke(&mut self, method: &str, args: &[Value]) -> OrmResult<RelatedValue>;
}

type LoaderFactory = Box<dyn Fn(LoadContext) -> Box<dyn RelationLoader> + Send + Sync>;

static LOADER_REGISTRY: Lazy<DashMap<String, Arc<LoaderFactory>>> = Lazy::new(DashMap::new);

/// Register the loader factory for an entity type. Re-registering replaces
/// the previous factory.
pub fn register_loader<F>(target_type: &str, factory: F)
where
    F: Fn(LoadContext) -> Box<dyn RelationLoader> + Send + Sync + 'static,
{
    LOADER_REGISTRY.insert(target_type.to_string(), Arc::new(Box::new(factory)));
}

/// Build a loader for a target type within a call's context
pub fn create_loader(target_type: &str, context: LoadContext) -> OrmResult<Box<dyn RelationLoader>> {
    let factory = LOADER_REGISTRY
        .get(target_type)
        .map(|entry| entry.clone())
        .ok_or_else(|| OrmError::TypeNotFound(target_type.to_string()))?;
    Ok((*factory)(context))
}
