//! Entity trait, related-value container, and the descriptor registry

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{OrmError, OrmResult};

pub mod descriptor;
pub mod registry;

pub use descriptor::{DescriptorBuilder, EntityDescriptor, PropertyDescriptor};
pub use registry::{descriptor, register_entity};

/// Object-safe surface every mapped entity implements.
///
/// Implemented via [`impl_entity!`] rather than by hand; the macro wires
/// the type name and the `Any` plumbing used for downcasting.
pub trait Entity: Any {
    /// Registered type name of this entity
    fn type_name(&self) -> &'static str;

    /// Registered type name, without an instance
    fn entity_type() -> &'static str
    where
        Self: Sized;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Deep copy behind the trait object
    fn clone_entity(&self) -> Box<dyn Entity>;
}

/// Wire a concrete type into the entity machinery.
///
/// ```ignore
/// #[derive(Debug, Clone, Default)]
/// struct Customer { id: i64, name: String }
/// impl_entity!(Customer, "Customer");
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty, $name:expr) => {
        impl $crate::model::Entity for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn entity_type() -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }

            fn clone_entity(&self) -> ::std::boxed::Box<dyn $crate::model::Entity> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }
        }
    };
}

/// Result of materializing a relation: a single optional entity or a
/// collection, matching the relation's cardinality.
pub enum RelatedValue {
    One(Option<Box<dyn Entity>>),
    Many(Vec<Box<dyn Entity>>),
}

impl RelatedValue {
    pub fn one<M: Entity>(entity: Option<M>) -> Self {
        RelatedValue::One(entity.map(|e| Box::new(e) as Box<dyn Entity>))
    }

    pub fn many<M: Entity>(entities: Vec<M>) -> Self {
        RelatedValue::Many(
            entities
                .into_iter()
                .map(|e| Box::new(e) as Box<dyn Entity>)
                .collect(),
        )
    }

    /// Downcast a single-valued relation to its concrete type
    pub fn into_one<M: Entity>(self) -> OrmResult<Option<M>> {
        match self {
            RelatedValue::One(entity) => entity.map(downcast_entity).transpose(),
            RelatedValue::Many(_) => Err(OrmError::Hydration(
                "expected a single related entity, found a collection".to_string(),
            )),
        }
    }

    /// Downcast a collection relation to its concrete type
    pub fn into_many<M: Entity>(self) -> OrmResult<Vec<M>> {
        match self {
            RelatedValue::Many(entities) => entities.into_iter().map(downcast_entity).collect(),
            RelatedValue::One(_) => Err(OrmError::Hydration(
                "expected a related collection, found a single entity".to_string(),
            )),
        }
    }
}

fn downcast_entity<M: Entity>(entity: Box<dyn Entity>) -> OrmResult<M> {
    let type_name = entity.type_name();
    entity
        .into_any()
        .downcast::<M>()
        .map(|boxed| *boxed)
        .map_err(|_| {
            OrmError::Hydration(format!(
                "related entity is '{}', expected '{}'",
                type_name,
                M::entity_type()
            ))
        })
}

impl Clone for RelatedValue {
    fn clone(&self) -> Self {
        match self {
            RelatedValue::One(entity) => {
                RelatedValue::One(entity.as_ref().map(|e| e.clone_entity()))
            }
            RelatedValue::Many(entities) => {
                RelatedValue::Many(entities.iter().map(|e| e.clone_entity()).collect())
            }
        }
    }
}

impl fmt::Debug for RelatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelatedValue::One(Some(entity)) => write!(f, "One({})", entity.type_name()),
            RelatedValue::One(None) => write!(f, "One(None)"),
            RelatedValue::Many(entities) => write!(f, "Many(len={})", entities.len()),
        }
    }
}

/// Convert a property value out of its JSON representation
pub fn from_value<T: DeserializeOwned>(value: Value) -> OrmResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// Convert a property value into its JSON representation
pub fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Widget {
        id: i64,
    }

    impl_entity!(Widget, "Widget");

    #[derive(Debug, Clone, Default)]
    struct Gadget;

    impl_entity!(Gadget, "Gadget");

    #[test]
    fn test_related_value_downcast() {
        let related = RelatedValue::one(Some(Widget { id: 7 }));
        assert_eq!(related.into_one::<Widget>().unwrap(), Some(Widget { id: 7 }));

        let related = RelatedValue::many(vec![Widget { id: 1 }, Widget { id: 2 }]);
        let widgets = related.into_many::<Widget>().unwrap();
        assert_eq!(widgets.len(), 2);
    }

    #[test]
    fn test_related_value_type_mismatch() {
        let related = RelatedValue::one(Some(Widget { id: 7 }));
        assert!(related.into_one::<Gadget>().is_err());

        let related = RelatedValue::many(vec![Widget { id: 1 }]);
        assert!(related.clone().into_one::<Widget>().is_err());
        assert!(RelatedValue::one(Some(Widget { id: 1 }))
            .into_many::<Widget>()
            .is_err());
    }

    #[test]
    fn test_clone_is_deep() {
        let related = RelatedValue::one(Some(Widget { id: 7 }));
        let copy = related.clone();
        let mut original = related.into_one::<Widget>().unwrap().unwrap();
        original.id = 99;
        assert_eq!(copy.into_one::<Widget>().unwrap().unwrap().id, 7);
    }
}
