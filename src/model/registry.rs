//! Global entity descriptor registry

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::error::{OrmError, OrmResult};
use crate::model::EntityDescriptor;

static ENTITY_REGISTRY: Lazy<DashMap<String, Arc<EntityDescriptor>>> = Lazy::new(DashMap::new);

/// Register an entity descriptor under its type name.
///
/// Relation metadata is validated up front so malformed registrations fail
/// at startup rather than mid-materialization. Re-registering a type
/// replaces the previous descriptor.
pub fn register_entity(descriptor: EntityDescriptor) -> OrmResult<()> {
    if descriptor.type_name().is_empty() {
        return Err(OrmError::Argument("entity type name is empty".to_string()));
    }
    for property in descriptor.properties() {
        if let Some(metadata) = property.relation() {
            metadata.validate()?;
        }
    }
    ENTITY_REGISTRY.insert(descriptor.type_name().to_string(), Arc::new(descriptor));
    Ok(())
}

/// Look up the descriptor for a type name
pub fn descriptor(type_name: &str) -> OrmResult<Arc<EntityDescriptor>> {
    ENTITY_REGISTRY
        .get(type_name)
        .map(|entry| entry.clone())
        .ok_or_else(|| OrmError::TypeNotFound(type_name.to_string()))
}
