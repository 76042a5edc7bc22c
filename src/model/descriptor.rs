//! Entity descriptors
//!
//! A descriptor is an explicit accessor table for one entity type: each
//! property carries typed getter/setter closures over the concrete type,
//! erased behind `dyn Entity` so the hydration and graph-loading machinery
//! can work without knowing the type. Relations additionally carry
//! [`RelationMetadata`] and a setter accepting a [`RelatedValue`].

use serde_json::Value;

use crate::error::{OrmError, OrmResult};
use crate::model::{Entity, RelatedValue};
use crate::relationships::RelationMetadata;

type Getter = Box<dyn Fn(&dyn Entity) -> OrmResult<Value> + Send + Sync>;
type Setter = Box<dyn Fn(&mut dyn Entity, Value) -> OrmResult<()> + Send + Sync>;
type RelatedSetter = Box<dyn Fn(&mut dyn Entity, RelatedValue) -> OrmResult<()> + Send + Sync>;

/// One property of an entity type
pub struct PropertyDescriptor {
    owner: String,
    name: String,
    getter: Option<Getter>,
    setter: Option<Setter>,
    relation: Option<RelationMetadata>,
    related_setter: Option<RelatedSetter>,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata when this property is a relation
    pub fn relation(&self) -> Option<&RelationMetadata> {
        self.relation.as_ref()
    }

    pub fn has_getter(&self) -> bool {
        self.getter.is_some()
    }

    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    pub fn has_related_setter(&self) -> bool {
        self.related_setter.is_some()
    }

    /// Read the property from an entity
    pub fn get(&self, entity: &dyn Entity) -> OrmResult<Value> {
        let getter = self
            .getter
            .as_ref()
            .ok_or_else(|| OrmError::method_not_found(&self.owner, &self.name))?;
        getter(entity)
    }

    /// Write the property on an entity
    pub fn set(&self, entity: &mut dyn Entity, value: Value) -> OrmResult<()> {
        let setter = self
            .setter
            .as_ref()
            .ok_or_else(|| OrmError::method_not_found(&self.owner, &self.name))?;
        setter(entity, value)
    }

    /// Assign a materialized relation to an entity
    pub fn set_related(&self, entity: &mut dyn Entity, value: RelatedValue) -> OrmResult<()> {
        let setter = self
            .related_setter
            .as_ref()
            .ok_or_else(|| OrmError::method_not_found(&self.owner, &self.name))?;
        setter(entity, value)
    }
}

/// Accessor table for one entity type
pub struct EntityDescriptor {
    type_name: String,
    properties: Vec<PropertyDescriptor>,
}

impl EntityDescriptor {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter()
    }
}

/// Builds an [`EntityDescriptor`] from typed closures over `M`
pub struct DescriptorBuilder<M: Entity> {
    type_name: String,
    properties: Vec<PropertyDescriptor>,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M: Entity> DescriptorBuilder<M> {
    pub fn new() -> Self {
        Self {
            type_name: M::entity_type().to_string(),
            properties: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Add a column property with a getter and a setter
    pub fn column<G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&M) -> Value + Send + Sync + 'static,
        S: Fn(&mut M, Value) -> OrmResult<()> + Send + Sync + 'static,
    {
        let owner = self.type_name.clone();
        let get_owner = owner.clone();
        let getter: Getter = Box::new(move |entity| {
            let concrete = entity
                .as_any()
                .downcast_ref::<M>()
                .ok_or_else(|| mismatch(&get_owner, entity.type_name()))?;
            Ok(get(concrete))
        });
        let set_owner = owner.clone();
        let setter: Setter = Box::new(move |entity, value| {
            let type_name = entity.type_name();
            let concrete = entity
                .as_any_mut()
                .downcast_mut::<M>()
                .ok_or_else(|| mismatch(&set_owner, type_name))?;
            set(concrete, value)
        });
        self.properties.push(PropertyDescriptor {
            owner,
            name: name.to_string(),
            getter: Some(getter),
            setter: Some(setter),
            relation: None,
            related_setter: None,
        });
        self
    }

    /// Add a read-only column property
    pub fn readonly<G>(mut self, name: &str, get: G) -> Self
    where
        G: Fn(&M) -> Value + Send + Sync + 'static,
    {
        let owner = self.type_name.clone();
        let get_owner = owner.clone();
        let getter: Getter = Box::new(move |entity| {
            let concrete = entity
                .as_any()
                .downcast_ref::<M>()
                .ok_or_else(|| mismatch(&get_owner, entity.type_name()))?;
            Ok(get(concrete))
        });
        self.properties.push(PropertyDescriptor {
            owner,
            name: name.to_string(),
            getter: Some(getter),
            setter: None,
            relation: None,
            related_setter: None,
        });
        self
    }

    /// Add a relation property
    pub fn relation<S>(mut self, name: &str, metadata: RelationMetadata, set: S) -> Self
    where
        S: Fn(&mut M, RelatedValue) -> OrmResult<()> + Send + Sync + 'static,
    {
        let owner = self.type_name.clone();
        let set_owner = owner.clone();
        let setter: RelatedSetter = Box::new(move |entity, value| {
            let type_name = entity.type_name();
            let concrete = entity
                .as_any_mut()
                .downcast_mut::<M>()
                .ok_or_else(|| mismatch(&set_owner, type_name))?;
            set(concrete, value)
        });
        self.properties.push(PropertyDescriptor {
            owner,
            name: name.to_string(),
            getter: None,
            setter: None,
            relation: Some(metadata),
            related_setter: Some(setter),
        });
        self
    }

    pub fn build(self) -> EntityDescriptor {
        EntityDescriptor {
            type_name: self.type_name,
            properties: self.properties,
        }
    }
}

impl<M: Entity> Default for DescriptorBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn mismatch(owner: &str, actual: &str) -> OrmError {
    OrmError::Hydration(format!("descriptor for '{}' applied to '{}'", owner, actual))
}
