//! Relationship metadata
//!
//! Each entity type describes its navigations once, in [`Entity::model`].
//! The [`ModelRegistry`] collects those models for a session; the query
//! pipeline resolves include paths against it and the cascade resolver walks
//! its cascade edges.
//!
//! [`Entity::model`]: crate::entity::Entity::model

mod model;
mod registry;

pub use model::{CascadeBehavior, EntityModel, EntityModelBuilder, NavigationEdge};
pub use registry::{ModelRegistry, ModelRegistryBuilder};
