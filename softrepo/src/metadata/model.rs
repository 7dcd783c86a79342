//! Entity models and navigation edges

use std::fmt;

use crate::entity::{Capabilities, Entity, EntityObject};

/// What deleting the principal does to its dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CascadeBehavior {
    /// Dependents are left alone
    #[default]
    None,
    /// The store cascades; the layer mirrors it for soft deletes
    Cascade,
    /// Only the layer cascades
    ClientCascade,
}

impl CascadeBehavior {
    /// Whether a delete of the principal propagates along this edge
    pub fn propagates_delete(self) -> bool {
        matches!(self, Self::Cascade | Self::ClientCascade)
    }
}

impl fmt::Display for CascadeBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Cascade => write!(f, "cascade"),
            Self::ClientCascade => write!(f, "client_cascade"),
        }
    }
}

/// A relationship as seen from its owner type
///
/// `foreign_key` always names the field on the dependent side: on the target
/// for principal-side edges, on the owner for dependent-side edges.
///
/// # Example
///
/// ```rust
/// use softrepo::metadata::{CascadeBehavior, NavigationEdge};
///
/// let lines = NavigationEdge::has_many("lines", "OrderLine", "order_id")
///     .with_cascade(CascadeBehavior::Cascade);
/// assert!(lines.is_collection);
/// assert!(!lines.is_on_dependent);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEdge {
    /// Navigation name, used in include paths
    pub name: &'static str,
    /// Type declaring the navigation
    pub owner_type: &'static str,
    /// Type on the other end
    pub target_type: &'static str,
    /// Navigation yields many targets
    pub is_collection: bool,
    /// The inverse navigation yields many owners
    pub inverse_is_collection: bool,
    /// The owner holds the foreign key
    pub is_on_dependent: bool,
    /// Foreign-key field on the dependent side
    pub foreign_key: &'static str,
    /// Type that declares the foreign key
    pub foreign_key_owner: &'static str,
    /// Delete propagation
    pub cascade: CascadeBehavior,
    /// Target is embedded in the owner
    pub is_owned: bool,
}

impl NavigationEdge {
    fn base(name: &'static str, target_type: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            owner_type: "",
            target_type,
            is_collection: false,
            inverse_is_collection: false,
            is_on_dependent: false,
            foreign_key,
            foreign_key_owner: "",
            cascade: CascadeBehavior::None,
            is_owned: false,
        }
    }

    /// Principal side of a one-to-many relationship
    #[must_use]
    pub fn has_many(
        name: &'static str,
        target_type: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            is_collection: true,
            foreign_key_owner: target_type,
            ..Self::base(name, target_type, foreign_key)
        }
    }

    /// Principal side of a one-to-one relationship
    #[must_use]
    pub fn has_one(
        name: &'static str,
        target_type: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            foreign_key_owner: target_type,
            ..Self::base(name, target_type, foreign_key)
        }
    }

    /// Dependent side of a one-to-many relationship
    #[must_use]
    pub fn belongs_to(
        name: &'static str,
        target_type: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            inverse_is_collection: true,
            is_on_dependent: true,
            ..Self::base(name, target_type, foreign_key)
        }
    }

    /// Dependent side of a one-to-one relationship
    #[must_use]
    pub fn belongs_to_one(
        name: &'static str,
        target_type: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            is_on_dependent: true,
            ..Self::base(name, target_type, foreign_key)
        }
    }

    /// Set delete propagation
    #[must_use]
    pub fn with_cascade(mut self, cascade: CascadeBehavior) -> Self {
        self.cascade = cascade;
        self
    }

    /// Mark the target as embedded in the owner
    #[must_use]
    pub fn owned(mut self) -> Self {
        self.is_owned = true;
        self
    }

    /// Override the type declaring the foreign key (e.g. a shared base table)
    #[must_use]
    pub fn declared_by(mut self, foreign_key_owner: &'static str) -> Self {
        self.foreign_key_owner = foreign_key_owner;
        self
    }

    /// Neither side is collection-valued
    pub fn is_one_to_one(&self) -> bool {
        !self.is_collection && !self.inverse_is_collection
    }

    /// Soft-deleting the owner would leave a one-to-one key occupied
    pub fn blocks_soft_delete(&self) -> bool {
        self.is_one_to_one() && self.foreign_key_owner != self.owner_type
    }

    /// Edge the cascade resolver follows
    pub fn is_cascade_edge(&self) -> bool {
        !self.is_on_dependent && self.cascade.propagates_delete() && !self.is_owned
    }

    /// Whether `candidate` is reached from `owner` through this edge
    pub fn links(&self, owner: &dyn EntityObject, candidate: &dyn EntityObject) -> bool {
        if candidate.type_name() != self.target_type {
            return false;
        }
        if self.is_on_dependent {
            owner
                .foreign_key_value(self.foreign_key)
                .is_some_and(|fk| fk == candidate.object_identity().key)
        } else {
            candidate
                .foreign_key_value(self.foreign_key)
                .is_some_and(|fk| fk == owner.object_identity().key)
        }
    }
}

/// Metadata of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityModel {
    /// Registered type name
    pub entity_type: &'static str,
    /// Name of the key field, informational
    pub key_field: &'static str,
    /// Declared facets
    pub capabilities: Capabilities,
    /// Navigations declared by this type
    pub navigations: Vec<NavigationEdge>,
}

impl EntityModel {
    /// Start a model for `T`
    pub fn builder<T: Entity>(key_field: &'static str) -> EntityModelBuilder {
        EntityModelBuilder {
            model: Self {
                entity_type: T::ENTITY_TYPE,
                key_field,
                capabilities: T::CAPABILITIES,
                navigations: Vec::new(),
            },
        }
    }

    /// Look up a navigation by name
    pub fn navigation(&self, name: &str) -> Option<&NavigationEdge> {
        self.navigations.iter().find(|edge| edge.name == name)
    }

    /// Edges the cascade resolver follows, in declaration order
    pub fn cascade_edges(&self) -> impl Iterator<Item = &NavigationEdge> {
        self.navigations.iter().filter(|edge| edge.is_cascade_edge())
    }

    /// First edge that makes a soft delete of this type unsafe
    pub fn unsafe_one_to_one_edge(&self) -> Option<&NavigationEdge> {
        self.navigations.iter().find(|edge| edge.blocks_soft_delete())
    }

    /// Whether the type carries the soft-delete facet
    pub fn is_soft_deletable(&self) -> bool {
        self.capabilities.contains(Capabilities::SOFT_DELETE)
    }
}

/// Builder for [`EntityModel`]
#[derive(Debug)]
pub struct EntityModelBuilder {
    model: EntityModel,
}

impl EntityModelBuilder {
    /// Declare a navigation
    ///
    /// The owner type is filled in from the model; dependent-side edges
    /// default to the owner as foreign-key declarer.
    #[must_use]
    pub fn navigation(mut self, mut edge: NavigationEdge) -> Self {
        edge.owner_type = self.model.entity_type;
        if edge.foreign_key_owner.is_empty() {
            edge.foreign_key_owner = self.model.entity_type;
        }
        self.model.navigations.push(edge);
        self
    }

    /// Finish the model
    pub fn build(self) -> EntityModel {
        self.model
    }
}
