//! Recursive relation resolution
//!
//! Walks the active load plan for paths rooted at an entity's type,
//! resolves each relation through the target type's loader, and assigns
//! the result. Identical (target type, argument signature) pairs within
//! one call tree are resolved once and served from the cache afterwards,
//! always as independent copies.

use tracing::debug;

use crate::error::{OrmError, OrmResult};
use crate::loading::{argument_signature, LoadContext, LoadPath, LoadPlan};
use crate::model::{self, Entity, EntityDescriptor};
use crate::relationships::{self, RelationMetadata};

/// Hard bound on relation recursion. Cyclic relation declarations whose
/// argument signatures never repeat would otherwise recurse forever.
pub const MAX_RELATION_DEPTH: usize = 32;

pub struct GraphLoader<'a> {
    context: &'a LoadContext,
    plan: &'a LoadPlan,
}

impl<'a> GraphLoader<'a> {
    pub fn new(context: &'a LoadContext, plan: &'a LoadPlan) -> Self {
        Self { context, plan }
    }

    /// Populate every relation of `entity` named by a plan path rooted at
    /// its type.
    pub fn populate(&self, entity: &mut dyn Entity) -> OrmResult<()> {
        let type_name = entity.type_name();
        if self.plan.rooted_at(type_name).next().is_none() {
            return Ok(());
        }
        let descriptor = model::descriptor(type_name)?;
        for path in self.plan.rooted_at(type_name) {
            self.resolve_path(entity, &descriptor, path)?;
        }
        Ok(())
    }

    fn resolve_path(
        &self,
        entity: &mut dyn Entity,
        descriptor: &EntityDescriptor,
        path: &LoadPath,
    ) -> OrmResult<()> {
        let type_name = descriptor.type_name();
        let property_name = path.direct_property();
        let property = descriptor
            .property(property_name)
            .ok_or_else(|| OrmError::method_not_found(type_name, property_name))?;
        let metadata = property.relation().cloned().ok_or_else(|| {
            OrmError::RelationMetadataMissing {
                type_name: type_name.to_string(),
                property: property_name.to_string(),
            }
        })?;
        if !property.has_related_setter() {
            return Err(OrmError::method_not_found(type_name, property_name));
        }

        let mut args = Vec::with_capacity(metadata.source_properties().len());
        for source in metadata.source_properties() {
            let source_property = descriptor
                .property(source)
                .ok_or_else(|| OrmError::method_not_found(type_name, source))?;
            args.push(source_property.get(entity)?);
        }
        let signature = argument_signature(&args);
        let child_plan = self.plan.rescope(path.route());

        let cached = self
            .context
            .cache()
            .borrow()
            .get(metadata.target_type(), &signature);
        let value = match cached {
            Some(hit) => {
                debug!(
                    target_type = metadata.target_type(),
                    signature = %signature,
                    "relation served from cache"
                );
                hit
            }
            None => self.resolve_relation(&metadata, &signature, child_plan, &args)?,
        };
        property.set_related(entity, value)
    }

    fn resolve_relation(
        &self,
        metadata: &RelationMetadata,
        signature: &str,
        child_plan: Option<LoadPlan>,
        args: &[serde_json::Value],
    ) -> OrmResult<crate::model::RelatedValue> {
        if self.context.depth() >= MAX_RELATION_DEPTH {
            return Err(OrmError::DepthExceeded(MAX_RELATION_DEPTH));
        }
        let target_type = metadata.target_type();

        // Check the loader out of the cache so the cache is free while the
        // loader recurses through it.
        let taken = self.context.cache().borrow_mut().take_loader(target_type);
        let mut loader = match taken {
            Some(loader) => loader,
            None => relationships::create_loader(target_type, self.context.clone())?,
        };
        loader.set_load_plan(child_plan);

        debug!(
            target_type,
            method = metadata.loader_method(),
            signature = %signature,
            depth = self.context.depth(),
            "resolving relation"
        );
        self.context.enter();
        let result = loader.invoke(metadata.loader_method(), args);
        self.context.leave();
        self.context
            .cache()
            .borrow_mut()
            .store_loader(target_type, loader);

        let value = result?;
        self.context
            .cache()
            .borrow_mut()
            .insert(target_type, signature, value.clone());
        Ok(value)
    }
}
