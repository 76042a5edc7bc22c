//! Relation metadata
//!
//! Describes how a relation property is materialized: which entity type it
//! yields, which loader method produces it, and which properties of the
//! owning entity feed that method as arguments, in order.

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMetadata {
    target_type: String,
    loader_method: String,
    source_properties: Vec<String>,
}

impl RelationMetadata {
    pub fn new(target_type: &str, loader_method: &str, source_properties: &[&str]) -> Self {
        Self {
            target_type: target_type.to_string(),
            loader_method: loader_method.to_string(),
            source_properties: source_properties.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Entity type the relation resolves to
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    /// Loader method invoked to materialize the relation
    pub fn loader_method(&self) -> &str {
        &self.loader_method
    }

    /// Owner properties supplying the loader arguments, in order
    pub fn source_properties(&self) -> &[String] {
        &self.source_properties
    }

    pub fn validate(&self) -> OrmResult<()> {
        if self.target_type.is_empty() {
            return Err(OrmError::Argument("relation target type is empty".to_string()));
        }
        if self.loader_method.is_empty() {
            return Err(OrmError::Argument("relation loader method is empty".to_string()));
        }
        if self.source_properties.iter().any(|p| p.is_empty()) {
            return Err(OrmError::Argument(
                "relation source property name is empty".to_string(),
            ));
        }
        Ok(())
    }
}
