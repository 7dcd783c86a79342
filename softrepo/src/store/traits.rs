//! The store contract consumed by sessions

use std::future::Future;

use crate::entity::{Entity, EntityIdentity, EntityObject};
use crate::metadata::NavigationEdge;
use crate::query::QueryPlan;
use crate::repository::RepositoryResult;

/// Rows returned by [`Store::fetch`]
#[derive(Debug)]
pub struct Fetched<T> {
    /// Root rows after the plan's filter, ordering and window
    pub rows: Vec<T>,
    /// Entities reached through the plan's include paths
    pub included: Vec<Box<dyn EntityObject>>,
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            included: Vec::new(),
        }
    }
}

/// What a save does to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// New row
    Insert,
    /// Modified row
    Update,
    /// Row marked deleted; persisted as an update
    SoftDelete,
    /// Physical removal
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::SoftDelete => write!(f, "soft_delete"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One pending write
#[derive(Debug, Clone)]
pub struct Change {
    /// Row identity
    pub identity: EntityIdentity,
    /// Kind of write
    pub kind: ChangeKind,
    /// Row state to persist
    pub entity: Box<dyn EntityObject>,
    /// Soft-delete flag when the row was attached
    pub original_deleted: bool,
    /// Concurrency stamp when the row was attached; compared against the
    /// stored stamp for concurrency-tracked types
    pub expected_stamp: Option<String>,
}

/// Ordered writes persisted atomically by [`Store::save`]
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Writes in the order they were recorded
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// Number of writes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Iterate over the writes
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// Iterate mutably over the writes
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Change> {
        self.changes.iter_mut()
    }
}

/// Transactional, queryable storage
///
/// Implementations report failures as [`RepositoryError`](crate::repository::RepositoryError)
/// values; sessions propagate them unchanged.
pub trait Store: Send + Sync + 'static {
    /// Execute a plan: active-record filter, predicate, ordering, window
    /// and include loading
    fn fetch<T: Entity>(
        &self,
        plan: &QueryPlan<T>,
    ) -> impl Future<Output = RepositoryResult<Fetched<T>>> + Send;

    /// Count rows admitted by the plan, ignoring its window
    fn count<T: Entity>(
        &self,
        plan: &QueryPlan<T>,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Whether any row is admitted by the plan
    fn any<T: Entity>(
        &self,
        plan: &QueryPlan<T>,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Load the rows `owner` reaches through `edge`
    ///
    /// With `active_only`, soft-deleted rows are left out.
    fn load_related(
        &self,
        edge: &NavigationEdge,
        owner: &dyn EntityObject,
        active_only: bool,
    ) -> impl Future<Output = RepositoryResult<Vec<Box<dyn EntityObject>>>> + Send;

    /// Persist a change set atomically; returns the number of rows written
    fn save(&self, changes: ChangeSet) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Open a transaction
    fn begin(&self) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Commit the open transaction
    fn commit(&self) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Roll back the open transaction
    fn rollback(&self) -> impl Future<Output = RepositoryResult<()>> + Send;
}
