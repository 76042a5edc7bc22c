//! Per-call materialization cache
//!
//! Scoped to one top-level call: resolved relation values keyed by
//! (target type, argument signature), plus the loaders already built for
//! the call. Cache hits hand out deep copies so sibling entities never
//! share relation instances. `reset` clears everything at the call
//! boundary; nothing survives across calls.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::RelatedValue;
use crate::relationships::RelationLoader;

/// Deduplication key for one relation resolution: the comma-joined string
/// forms of the argument values, nulls as empty strings.
pub fn argument_signature(args: &[Value]) -> String {
    args.iter()
        .map(|value| match value {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<String>>()
        .join(",")
}

#[derive(Default)]
pub struct MaterializationCache {
    entities: HashMap<String, HashMap<String, RelatedValue>>,
    loaders: HashMap<String, Box<dyn RelationLoader>>,
}

impl MaterializationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep copy of a cached relation value, if present
    pub fn get(&self, target_type: &str, signature: &str) -> Option<RelatedValue> {
        self.entities
            .get(target_type)
            .and_then(|by_signature| by_signature.get(signature))
            .cloned()
    }

    pub fn insert(&mut self, target_type: &str, signature: &str, value: RelatedValue) {
        self.entities
            .entry(target_type.to_string())
            .or_default()
            .insert(signature.to_string(), value);
    }

    /// Check a loader out of the cache for invocation.
    ///
    /// The loader is removed so the cache is not borrowed while the loader
    /// runs; [`store_loader`](Self::store_loader) puts it back.
    pub fn take_loader(&mut self, target_type: &str) -> Option<Box<dyn RelationLoader>> {
        self.loaders.remove(target_type)
    }

    /// Return a loader after invocation. A loader already present for the
    /// type wins; the returned one is dropped.
    pub fn store_loader(&mut self, target_type: &str, loader: Box<dyn RelationLoader>) {
        self.loaders.entry(target_type.to_string()).or_insert(loader);
    }

    pub fn reset(&mut self) {
        self.entities.clear();
        self.loaders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_entity;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tag {
        label: String,
    }

    impl_entity!(Tag, "CacheTestTag");

    #[test]
    fn test_signature_rules() {
        assert_eq!(argument_signature(&[]), "");
        assert_eq!(argument_signature(&[json!(null)]), "");
        assert_eq!(argument_signature(&[json!("abc"), json!(null), json!(42)]), "abc,,42");
        assert_eq!(argument_signature(&[json!(true), json!(1.5)]), "true,1.5");
    }

    #[test]
    fn test_hits_are_independent_copies() {
        let mut cache = MaterializationCache::new();
        cache.insert(
            "CacheTestTag",
            "42",
            RelatedValue::one(Some(Tag { label: "alpha".to_string() })),
        );

        let first = cache.get("CacheTestTag", "42").unwrap();
        let mut tag = first.into_one::<Tag>().unwrap().unwrap();
        tag.label = "mutated".to_string();

        let second = cache.get("CacheTestTag", "42").unwrap();
        assert_eq!(
            second.into_one::<Tag>().unwrap().unwrap().label,
            "alpha"
        );
        assert!(cache.get("CacheTestTag", "43").is_none());
        assert!(cache.get("CacheTestOther", "42").is_none());

        cache.reset();
        assert!(cache.get("CacheTestTag", "42").is_none());
    }
}
