//! Model registry: every entity type known to a session

use std::collections::HashMap;

use crate::entity::Entity;
use crate::query::ResolvedInclude;
use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

use super::{EntityModel, NavigationEdge};

/// Entity models keyed by registered type name
///
/// # Example
///
/// ```rust,ignore
/// let registry = ModelRegistry::builder()
///     .register::<Customer>()
///     .register::<Order>()
///     .register::<OrderLine>()
///     .build()?;
///
/// let include = registry.resolve_include("Customer", "orders.lines")?;
/// assert_eq!(include.edges.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<&'static str, EntityModel>,
}

impl ModelRegistry {
    /// Start an empty registry
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Model of a registered type
    pub fn model(&self, entity_type: &str) -> Option<&EntityModel> {
        self.models.get(entity_type)
    }

    /// Model of a registered type, or a validation error
    pub fn require(&self, entity_type: &str) -> RepositoryResult<&EntityModel> {
        self.models.get(entity_type).ok_or_else(|| {
            RepositoryError::validation_failed(
                RepositoryOperation::BuildQuery,
                format!("Entity type '{entity_type}' is not registered"),
            )
        })
    }

    /// Registered type names
    pub fn entity_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.models.keys().copied()
    }

    /// Resolve a dotted include path into the chain of edges it walks
    pub fn resolve_include(
        &self,
        root_type: &'static str,
        path: &str,
    ) -> RepositoryResult<ResolvedInclude> {
        let mut edges: Vec<NavigationEdge> = Vec::new();
        let mut current = root_type;

        for segment in path.split('.').map(str::trim) {
            if segment.is_empty() {
                return Err(RepositoryError::validation_failed(
                    RepositoryOperation::BuildQuery,
                    format!("Include path '{path}' has an empty segment"),
                ));
            }
            let edge = self.require(current)?.navigation(segment).ok_or_else(|| {
                RepositoryError::validation_failed(
                    RepositoryOperation::BuildQuery,
                    format!("'{current}' has no navigation '{segment}' (include '{path}')"),
                )
            })?;
            current = edge.target_type;
            edges.push(edge.clone());
        }

        Ok(ResolvedInclude {
            path: path.to_string(),
            edges,
        })
    }
}

/// Builder for [`ModelRegistry`]
#[derive(Debug, Default)]
pub struct ModelRegistryBuilder {
    models: Vec<EntityModel>,
}

impl ModelRegistryBuilder {
    /// Register an entity type
    #[must_use]
    pub fn register<T: Entity>(mut self) -> Self {
        self.models.push(T::model());
        self
    }

    /// Register a prebuilt model
    #[must_use]
    pub fn model(mut self, model: EntityModel) -> Self {
        self.models.push(model);
        self
    }

    /// Validate and finish the registry
    ///
    /// Fails when a type is registered twice or an edge points at an
    /// unregistered type.
    pub fn build(self) -> RepositoryResult<ModelRegistry> {
        let mut models = HashMap::with_capacity(self.models.len());
        for model in self.models {
            let entity_type = model.entity_type;
            if models.insert(entity_type, model).is_some() {
                return Err(RepositoryError::validation_failed(
                    RepositoryOperation::BuildQuery,
                    format!("Entity type '{entity_type}' registered twice"),
                ));
            }
        }

        for model in models.values() {
            for edge in &model.navigations {
                if !models.contains_key(edge.target_type) {
                    return Err(RepositoryError::validation_failed(
                        RepositoryOperation::BuildQuery,
                        format!(
                            "Navigation '{}.{}' targets unregistered type '{}'",
                            model.entity_type, edge.name, edge.target_type
                        ),
                    ));
                }
            }
        }

        tracing::debug!(entity_types = models.len(), "Model registry built");
        Ok(ModelRegistry { models })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;
    use crate::testing::{self, Customer, Order};

    #[test]
    fn test_resolve_nested_include() {
        let registry = testing::registry();
        let include = registry.resolve_include("Customer", "orders.lines").unwrap();
        let names: Vec<_> = include.edges.iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["orders", "lines"]);
        assert_eq!(include.edges[1].owner_type, "Order");
    }

    #[test]
    fn test_unknown_navigation_is_validation_error() {
        let registry = testing::registry();
        let err = registry.resolve_include("Order", "lines.warehouse").unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert!(err.message.contains("warehouse"));
    }

    #[test]
    fn test_empty_segment_rejected() {
        let registry = testing::registry();
        let err = registry.resolve_include("Order", "lines..order").unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
    }

    #[test]
    fn test_unregistered_target_fails_build() {
        let err = ModelRegistry::builder()
            .register::<Order>()
            .build()
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
    }

    #[test]
    fn test_duplicate_registration_fails_build() {
        let err = ModelRegistry::builder()
            .register::<Customer>()
            .register::<Customer>()
            .build()
            .unwrap_err();
        assert!(err.message.contains("twice"));
    }
}
