//! Soft-delete cascade resolver
//!
//! A delete call runs `validate -> (soft | hard) -> discover -> mark`:
//!
//! - Validation looks at the root type only. A soft delete of a type that is
//!   the principal of a one-to-one relationship whose foreign key lives on the
//!   other side is rejected, because the dependent would keep occupying the
//!   unique key.
//! - Types without the soft-delete facet, and permanent deletes, take the hard
//!   path: the root is scheduled for removal and nothing cascades here.
//! - The soft path walks cascade edges depth first from principal to
//!   dependent. Navigations that are not materialized in the unit of work are
//!   loaded through [`Store::load_related`], active rows only.
//! - Discovery finishes before anything is marked, so a failed or cancelled
//!   load leaves the unit of work untouched.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::entity::{EntityIdentity, EntityObject};
use crate::metadata::{ModelRegistry, NavigationEdge};
use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};
use crate::store::{cancellable, Store};
use crate::unit_of_work::{EntryState, UnitOfWork};

/// What a delete call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The root was already soft-deleted; nothing changed
    AlreadyDeleted,
    /// The root and its cascade set were marked deleted, root first
    SoftDeleted(Vec<EntityIdentity>),
    /// The root was scheduled for physical removal
    Removed,
}

/// Resolves deletes against one unit of work
pub(crate) struct CascadeResolver<'a, S> {
    store: &'a S,
    registry: &'a ModelRegistry,
    cancel: &'a CancellationToken,
}

#[derive(Default)]
struct Discovery {
    staged: HashMap<EntityIdentity, Box<dyn EntityObject>>,
    loaded: Vec<(EntityIdentity, NavigationEdge)>,
    visited: HashSet<EntityIdentity>,
}

impl Discovery {
    fn is_loaded(&self, uow: &UnitOfWork, owner: &EntityIdentity, edge: &NavigationEdge) -> bool {
        uow.is_loaded(owner, edge)
            || self
                .loaded
                .iter()
                .any(|(id, loaded)| id == owner && loaded.name == edge.name)
    }

    fn current(&self, uow: &UnitOfWork, identity: &EntityIdentity) -> Option<Box<dyn EntityObject>> {
        uow.entry(identity)
            .map(|entry| entry.entity().clone_object())
            .or_else(|| self.staged.get(identity).cloned())
    }
}

impl<'a, S: Store> CascadeResolver<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        registry: &'a ModelRegistry,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            store,
            registry,
            cancel,
        }
    }

    /// Delete `root`, cascading soft deletes to its dependents
    pub(crate) async fn delete(
        &self,
        uow: &mut UnitOfWork,
        root: Box<dyn EntityObject>,
        permanent: bool,
    ) -> RepositoryResult<DeleteOutcome> {
        let identity = root.object_identity();
        let model = self
            .registry
            .require(identity.entity_type)
            .map_err(|e| e.with_operation(RepositoryOperation::Delete))?;

        if permanent || !model.is_soft_deletable() {
            if !uow.contains(&identity) {
                uow.attach(root);
            }
            uow.mark_deleted(&identity);
            debug!(entity_type = identity.entity_type, entity_id = %identity.key, "Scheduled for removal");
            return Ok(DeleteOutcome::Removed);
        }

        if let Some(edge) = model.unsafe_one_to_one_edge() {
            warn!(
                entity_type = identity.entity_type,
                entity_id = %identity.key,
                navigation = edge.name,
                "Rejected soft delete across one-to-one relationship"
            );
            return Err(RepositoryError::unsafe_one_to_one(
                identity.entity_type,
                identity.key.to_string(),
                edge.name,
            ));
        }

        if uow.state_of(&identity) == Some(EntryState::Deleted) {
            debug!(entity_type = identity.entity_type, entity_id = %identity.key, "Already scheduled for removal");
            return Ok(DeleteOutcome::Removed);
        }

        let root_deleted = match uow.entry(&identity) {
            Some(entry) => entry.entity().is_marked_deleted(),
            None => root.is_marked_deleted(),
        };
        if root_deleted {
            debug!(entity_type = identity.entity_type, entity_id = %identity.key, "Already deleted");
            return Ok(DeleteOutcome::AlreadyDeleted);
        }

        let mut discovery = Discovery::default();
        if !uow.contains(&identity) {
            discovery.staged.insert(identity.clone(), root);
        }
        let cascade_set = self.discover(uow, &mut discovery, identity).await?;

        for (_, entity) in discovery.staged {
            uow.attach(entity);
        }
        for (owner, edge) in &discovery.loaded {
            uow.mark_loaded(owner, edge);
        }
        for member in &cascade_set {
            uow.mark_soft_deleted(member);
        }

        debug!(marked = cascade_set.len(), "Soft delete cascade applied");
        Ok(DeleteOutcome::SoftDeleted(cascade_set))
    }

    async fn discover(
        &self,
        uow: &UnitOfWork,
        discovery: &mut Discovery,
        root: EntityIdentity,
    ) -> RepositoryResult<Vec<EntityIdentity>> {
        let mut cascade_set = Vec::new();
        let mut stack = vec![root.clone()];
        discovery.visited.insert(root);

        while let Some(current) = stack.pop() {
            let model = self
                .registry
                .require(current.entity_type)
                .map_err(|e| e.with_operation(RepositoryOperation::Delete))?;
            let Some(owner) = discovery.current(uow, &current) else {
                continue;
            };

            for edge in model.cascade_edges() {
                let dependents = self
                    .dependents(uow, discovery, &current, &*owner, edge)
                    .await?;
                debug!(
                    owner = %current,
                    navigation = edge.name,
                    dependents = dependents.len(),
                    "Following cascade edge"
                );

                for dependent in dependents {
                    let id = dependent.object_identity();
                    if !discovery.visited.insert(id.clone()) || dependent.is_marked_deleted() {
                        continue;
                    }
                    // A pending physical removal outranks the cascade
                    if uow.state_of(&id) == Some(EntryState::Deleted) {
                        continue;
                    }
                    if dependent.soft_delete_state().is_none() {
                        debug!(dependent = %id, "Dependent has no soft-delete facet, left untouched");
                        continue;
                    }
                    if !uow.contains(&id) {
                        discovery.staged.insert(id.clone(), dependent);
                    }
                    stack.push(id);
                }
            }
            cascade_set.push(current);
        }

        Ok(cascade_set)
    }

    async fn dependents(
        &self,
        uow: &UnitOfWork,
        discovery: &mut Discovery,
        owner_id: &EntityIdentity,
        owner: &dyn EntityObject,
        edge: &NavigationEdge,
    ) -> RepositoryResult<Vec<Box<dyn EntityObject>>> {
        let mut found: Vec<Box<dyn EntityObject>> = uow
            .tracked_related(edge, owner)
            .iter()
            .filter_map(|id| uow.entry(id))
            .map(|entry| entry.entity().clone_object())
            .collect();

        if discovery.is_loaded(uow, owner_id, edge) {
            return Ok(found);
        }

        let rows = cancellable(
            self.cancel,
            RepositoryOperation::LoadRelated,
            self.store.load_related(edge, owner, true),
        )
        .await?;
        discovery.loaded.push((owner_id.clone(), edge.clone()));

        for row in rows {
            let id = row.object_identity();
            if uow.contains(&id) {
                continue;
            }
            match discovery.staged.get(&id) {
                Some(staged) => found.push(staged.clone()),
                None => found.push(row),
            }
        }
        Ok(found)
    }
}
