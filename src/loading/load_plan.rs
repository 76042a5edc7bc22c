//! Eager-load paths and plans
//!
//! A path is a dotted route of alternating (owner type, property) segments,
//! e.g. `Order.Customer` or `Order.Customer.Customer.Orders`. Every
//! property segment must name a relation on its owner type; validation
//! runs against the entity registry at construction time. A plan is an
//! ordered list of paths and can be re-scoped one relation deeper as the
//! graph loader descends.

use crate::error::{OrmError, OrmResult};
use crate::model;

/// One eager-load instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPath {
    tokens: Vec<String>,
    route: String,
}

impl LoadPath {
    /// Path for a direct relation property of `owner_type`
    pub fn new(owner_type: &str, property: &str) -> OrmResult<Self> {
        let mut path = LoadPath {
            tokens: Vec::new(),
            route: String::new(),
        };
        path.extend(owner_type, property)?;
        Ok(path)
    }

    /// Extend the path one relation deeper.
    ///
    /// `owner_type` is the target type of the previous segment; the check
    /// is left to the registry lookup rather than cross-validated here.
    pub fn then(mut self, owner_type: &str, property: &str) -> OrmResult<Self> {
        self.extend(owner_type, property)?;
        Ok(self)
    }

    /// Parse and validate a dotted route
    pub fn from_route(route: &str) -> OrmResult<Self> {
        let segments: Vec<&str> = route.split('.').collect();
        if segments.len() < 2 || segments.len() % 2 != 0 || segments.iter().any(|s| s.is_empty()) {
            return Err(OrmError::Argument(format!("malformed load route '{}'", route)));
        }
        let mut path = LoadPath {
            tokens: Vec::new(),
            route: String::new(),
        };
        for pair in segments.chunks(2) {
            path.extend(pair[0], pair[1])?;
        }
        Ok(path)
    }

    fn extend(&mut self, owner_type: &str, property: &str) -> OrmResult<()> {
        let descriptor = model::descriptor(owner_type)?;
        let descriptor_property = descriptor
            .property(property)
            .ok_or_else(|| OrmError::method_not_found(owner_type, property))?;
        if descriptor_property.relation().is_none() {
            return Err(OrmError::RelationMetadataMissing {
                type_name: owner_type.to_string(),
                property: property.to_string(),
            });
        }
        self.tokens.push(owner_type.to_string());
        self.tokens.push(property.to_string());
        if !self.route.is_empty() {
            self.route.push('.');
        }
        self.route.push_str(owner_type);
        self.route.push('.');
        self.route.push_str(property);
        Ok(())
    }

    // Rescoped sub-paths reuse the validation done on the parent path.
    fn from_tokens(tokens: Vec<String>) -> Self {
        let route = tokens.join(".");
        LoadPath { tokens, route }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn depth(&self) -> usize {
        self.tokens.len()
    }

    /// True when the path denotes a direct property of `type_name`
    pub fn is_rooted_at(&self, type_name: &str) -> bool {
        self.tokens.len() == 2 && self.tokens[0] == type_name
    }

    /// Property segment of a direct path
    pub fn direct_property(&self) -> &str {
        &self.tokens[1]
    }
}

/// Ordered collection of load paths for one materialization call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPlan {
    paths: Vec<LoadPath>,
}

impl LoadPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: LoadPath) {
        self.paths.push(path);
    }

    /// Chainable form of [`add`](Self::add)
    pub fn with(mut self, path: LoadPath) -> Self {
        self.add(path);
        self
    }

    /// Validate and add a direct relation path
    pub fn add_path(&mut self, owner_type: &str, property: &str) -> OrmResult<()> {
        self.add(LoadPath::new(owner_type, property)?);
        Ok(())
    }

    pub fn paths(&self) -> impl Iterator<Item = &LoadPath> {
        self.paths.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths denoting a direct property of `type_name`
    pub fn rooted_at<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a LoadPath> {
        self.paths.iter().filter(move |p| p.is_rooted_at(type_name))
    }

    /// Plan for the next recursion level under `route`.
    ///
    /// Keeps every path strictly nested under `route`, with the prefix
    /// stripped. `None` when no path qualifies.
    pub fn rescope(&self, route: &str) -> Option<LoadPlan> {
        let prefix = format!("{}.", route);
        let rescoped: Vec<LoadPath> = self
            .paths
            .iter()
            .filter(|p| p.route != route && p.route.starts_with(&prefix))
            .map(|p| {
                let skip = route.split('.').count();
                LoadPath::from_tokens(p.tokens[skip..].to_vec())
            })
            .collect();
        if rescoped.is_empty() {
            None
        } else {
            Some(LoadPlan { paths: rescoped })
        }
    }
}
