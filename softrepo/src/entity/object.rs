//! Type-erased view of an entity
//!
//! The unit of work and the cascade resolver handle rows of many entity types
//! at once. [`EntityObject`] is the object-safe projection of [`Entity`] they
//! work with; every `Entity` gets it through the blanket impl below. Typed
//! values are recovered with [`downcast_ref`](dyn EntityObject::downcast_ref)
//! at the repository boundary, where the static type is known.

use std::any::Any;
use std::fmt;

use super::{
    Capabilities, Concurrency, CorrelationTags, CreationAudit, Entity, EntityIdentity, KeyValue,
    ModificationAudit, SoftDelete,
};

/// Object-safe projection of an [`Entity`]
pub trait EntityObject: fmt::Debug + Send + Sync {
    /// Registered type name
    fn type_name(&self) -> &'static str;

    /// Declared facets
    fn capability_set(&self) -> Capabilities;

    /// Type name plus key
    fn object_identity(&self) -> EntityIdentity;

    /// Foreign-key value held in `field`
    fn foreign_key_value(&self, field: &str) -> Option<KeyValue>;

    /// Soft-delete facet, if declared and present
    fn soft_delete_state(&self) -> Option<&SoftDelete>;

    /// Mutable soft-delete facet, if declared and present
    fn soft_delete_state_mut(&mut self) -> Option<&mut SoftDelete>;

    /// Mutable creation audit facet, if declared and present
    fn creation_state_mut(&mut self) -> Option<&mut CreationAudit>;

    /// Mutable modification audit facet, if declared and present
    fn modification_state_mut(&mut self) -> Option<&mut ModificationAudit>;

    /// Concurrency facet, if declared and present
    fn concurrency_state(&self) -> Option<&Concurrency>;

    /// Mutable concurrency facet, if declared and present
    fn concurrency_state_mut(&mut self) -> Option<&mut Concurrency>;

    /// Mutable correlation tags, if declared and present
    fn correlation_state_mut(&mut self) -> Option<&mut CorrelationTags>;

    /// Clone behind a fresh box
    fn clone_object(&self) -> Box<dyn EntityObject>;

    /// Borrow as [`Any`] for typed recovery
    fn as_any(&self) -> &dyn Any;
}

fn declared<T: Entity>(capability: Capabilities) -> bool {
    T::CAPABILITIES.contains(capability)
}

impl<T: Entity> EntityObject for T {
    fn type_name(&self) -> &'static str {
        T::ENTITY_TYPE
    }

    fn capability_set(&self) -> Capabilities {
        T::CAPABILITIES
    }

    fn object_identity(&self) -> EntityIdentity {
        Entity::identity(self)
    }

    fn foreign_key_value(&self, field: &str) -> Option<KeyValue> {
        Entity::foreign_key(self, field)
    }

    fn soft_delete_state(&self) -> Option<&SoftDelete> {
        if declared::<T>(Capabilities::SOFT_DELETE) {
            Entity::soft_delete(self)
        } else {
            None
        }
    }

    fn soft_delete_state_mut(&mut self) -> Option<&mut SoftDelete> {
        if declared::<T>(Capabilities::SOFT_DELETE) {
            Entity::soft_delete_mut(self)
        } else {
            None
        }
    }

    fn creation_state_mut(&mut self) -> Option<&mut CreationAudit> {
        if declared::<T>(Capabilities::CREATION_AUDITED) {
            Entity::creation_audit_mut(self)
        } else {
            None
        }
    }

    fn modification_state_mut(&mut self) -> Option<&mut ModificationAudit> {
        if declared::<T>(Capabilities::MODIFICATION_AUDITED) {
            Entity::modification_audit_mut(self)
        } else {
            None
        }
    }

    fn concurrency_state(&self) -> Option<&Concurrency> {
        if declared::<T>(Capabilities::CONCURRENCY) {
            Entity::concurrency(self)
        } else {
            None
        }
    }

    fn concurrency_state_mut(&mut self) -> Option<&mut Concurrency> {
        if declared::<T>(Capabilities::CONCURRENCY) {
            Entity::concurrency_mut(self)
        } else {
            None
        }
    }

    fn correlation_state_mut(&mut self) -> Option<&mut CorrelationTags> {
        if declared::<T>(Capabilities::CORRELATION) {
            Entity::correlation_mut(self)
        } else {
            None
        }
    }

    fn clone_object(&self) -> Box<dyn EntityObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<'a> dyn EntityObject + 'a {
    /// Recover the concrete entity
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether the row carries a soft-delete facet with the flag set
    pub fn is_marked_deleted(&self) -> bool {
        self.soft_delete_state().is_some_and(|s| s.is_deleted)
    }

    /// Current concurrency stamp as a string, if any
    pub fn stamp(&self) -> Option<String> {
        self.concurrency_state()
            .and_then(|c| c.stamp.as_ref())
            .map(|s| s.as_str().to_string())
    }
}

impl Clone for Box<dyn EntityObject> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}
