//! Entity contracts
//!
//! An entity is a plain Rust struct implementing [`Entity`]. The trait carries
//! everything the layer needs to know about a type statically: its registered
//! name, its capability facets, its key, the foreign keys it holds, its
//! relationship model and its queryable fields.
//!
//! # Example
//!
//! ```rust
//! use once_cell::sync::Lazy;
//! use softrepo::entity::{Capabilities, Entity, KeyValue, SoftDelete};
//! use softrepo::metadata::EntityModel;
//! use softrepo::query::FieldRegistry;
//!
//! #[derive(Debug, Clone)]
//! struct Tag {
//!     id: i64,
//!     label: String,
//!     deleted: SoftDelete,
//! }
//!
//! static TAG_FIELDS: Lazy<FieldRegistry<Tag>> = Lazy::new(|| {
//!     FieldRegistry::builder()
//!         .field("id", |t: &Tag| t.id.into())
//!         .field("label", |t: &Tag| t.label.as_str().into())
//!         .build()
//! });
//!
//! impl Entity for Tag {
//!     const ENTITY_TYPE: &'static str = "Tag";
//!     const CAPABILITIES: Capabilities = Capabilities::SOFT_DELETE;
//!
//!     fn key(&self) -> KeyValue {
//!         self.id.into()
//!     }
//!
//!     fn model() -> EntityModel {
//!         EntityModel::builder::<Self>("id").build()
//!     }
//!
//!     fn fields() -> &'static FieldRegistry<Self> {
//!         &TAG_FIELDS
//!     }
//!
//!     fn soft_delete(&self) -> Option<&SoftDelete> {
//!         Some(&self.deleted)
//!     }
//!
//!     fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
//!         Some(&mut self.deleted)
//!     }
//! }
//! ```

mod facets;
mod key;
mod object;

use std::fmt;

pub use facets::{
    Capabilities, Concurrency, CorrelationTags, CreationAudit, ModificationAudit, SoftDelete,
};
pub use key::{EntityIdentity, KeyValue};
pub use object::EntityObject;

use crate::metadata::EntityModel;
use crate::query::FieldRegistry;

/// A persistent record type managed by the layer
///
/// Facet accessors default to `None`; a type overrides the ones matching its
/// [`CAPABILITIES`](Entity::CAPABILITIES). A facet is only honored when it is
/// both declared and returned.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Registered type name, unique within a model registry
    const ENTITY_TYPE: &'static str;

    /// Facets carried by this type
    const CAPABILITIES: Capabilities = Capabilities::NONE;

    /// Identity key of this row
    fn key(&self) -> KeyValue;

    /// Value of a foreign-key field held by this row
    fn foreign_key(&self, _field: &str) -> Option<KeyValue> {
        None
    }

    /// Relationship model of this type
    fn model() -> EntityModel;

    /// Named field accessors used for sorting and named filters
    fn fields() -> &'static FieldRegistry<Self>;

    /// Soft-delete facet
    fn soft_delete(&self) -> Option<&SoftDelete> {
        None
    }

    /// Mutable soft-delete facet
    fn soft_delete_mut(&mut self) -> Option<&mut SoftDelete> {
        None
    }

    /// Creation audit facet
    fn creation_audit(&self) -> Option<&CreationAudit> {
        None
    }

    /// Mutable creation audit facet
    fn creation_audit_mut(&mut self) -> Option<&mut CreationAudit> {
        None
    }

    /// Modification audit facet
    fn modification_audit(&self) -> Option<&ModificationAudit> {
        None
    }

    /// Mutable modification audit facet
    fn modification_audit_mut(&mut self) -> Option<&mut ModificationAudit> {
        None
    }

    /// Concurrency facet
    fn concurrency(&self) -> Option<&Concurrency> {
        None
    }

    /// Mutable concurrency facet
    fn concurrency_mut(&mut self) -> Option<&mut Concurrency> {
        None
    }

    /// Correlation tags facet
    fn correlation(&self) -> Option<&CorrelationTags> {
        None
    }

    /// Mutable correlation tags facet
    fn correlation_mut(&mut self) -> Option<&mut CorrelationTags> {
        None
    }

    /// Identity of this row
    fn identity(&self) -> EntityIdentity {
        EntityIdentity {
            entity_type: Self::ENTITY_TYPE,
            key: self.key(),
        }
    }

    /// Whether this row is soft-deleted
    fn is_deleted(&self) -> bool {
        Self::CAPABILITIES.contains(Capabilities::SOFT_DELETE)
            && self.soft_delete().is_some_and(|s| s.is_deleted)
    }
}

/// An entity addressable by a typed surrogate key
pub trait KeyedEntity: Entity {
    /// Key type accepted by key lookups
    type Key: Into<KeyValue> + Clone + fmt::Debug + Send + Sync;
}
