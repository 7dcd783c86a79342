//! Unit of work: the identity map of one session
//!
//! Every tracked row has exactly one [`Entry`], keyed by its
//! [`EntityIdentity`]. The entry records the row's current state, how it will
//! be persisted, and what it looked like when it was attached (soft-delete
//! flag and concurrency stamp), which the audit pass and the store's
//! concurrency check need.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::entity::{Entity, EntityIdentity, EntityObject};
use crate::metadata::NavigationEdge;
use crate::repository::{
    RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult,
};
use crate::store::{Change, ChangeKind, ChangeSet};

/// Persistence state of a tracked row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// New; inserted on save
    Added,
    /// Matches the store
    Unchanged,
    /// Updated on save
    Modified,
    /// Marked deleted; updated on save
    SoftDeleted,
    /// Removed on save
    Deleted,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Modified => write!(f, "modified"),
            Self::SoftDeleted => write!(f, "soft_deleted"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// One tracked row
#[derive(Debug, Clone)]
pub struct Entry {
    entity: Box<dyn EntityObject>,
    state: EntryState,
    original_deleted: bool,
    original_stamp: Option<String>,
}

impl Entry {
    fn new(entity: Box<dyn EntityObject>, state: EntryState) -> Self {
        let original_deleted = entity.is_marked_deleted();
        let original_stamp = entity.stamp();
        Self {
            entity,
            state,
            original_deleted,
            original_stamp,
        }
    }

    /// Current row state
    pub fn entity(&self) -> &dyn EntityObject {
        self.entity.as_ref()
    }

    /// Persistence state
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Soft-delete flag when the row was attached
    pub fn original_deleted(&self) -> bool {
        self.original_deleted
    }

    /// Concurrency stamp when the row was attached
    pub fn original_stamp(&self) -> Option<&str> {
        self.original_stamp.as_deref()
    }

    fn change_kind(&self) -> Option<ChangeKind> {
        match self.state {
            EntryState::Added => Some(ChangeKind::Insert),
            EntryState::Unchanged => None,
            EntryState::Modified => Some(ChangeKind::Update),
            EntryState::SoftDeleted => Some(ChangeKind::SoftDelete),
            EntryState::Deleted => Some(ChangeKind::Delete),
        }
    }
}

/// Identity map plus loaded-navigation bookkeeping
#[derive(Debug, Default)]
pub struct UnitOfWork {
    entries: HashMap<EntityIdentity, Entry>,
    order: Vec<EntityIdentity>,
    loaded: HashSet<(EntityIdentity, &'static str)>,
}

impl UnitOfWork {
    /// Create an empty unit of work
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked rows
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `identity`
    pub fn entry(&self, identity: &EntityIdentity) -> Option<&Entry> {
        self.entries.get(identity)
    }

    /// Whether `identity` is tracked
    pub fn contains(&self, identity: &EntityIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    /// State of a tracked row
    pub fn state_of(&self, identity: &EntityIdentity) -> Option<EntryState> {
        self.entries.get(identity).map(Entry::state)
    }

    /// Typed copy of a tracked row
    pub fn get<T: Entity>(&self, identity: &EntityIdentity) -> Option<T> {
        self.entries
            .get(identity)
            .and_then(|entry| entry.entity.downcast_ref::<T>())
            .cloned()
    }

    /// Tracked entries in attach order
    pub fn entries(&self) -> impl Iterator<Item = (&EntityIdentity, &Entry)> {
        self.order
            .iter()
            .filter_map(|identity| self.entries.get(identity).map(|entry| (identity, entry)))
    }

    /// Whether a save would write anything
    pub fn has_changes(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.state != EntryState::Unchanged)
    }

    fn insert(&mut self, identity: EntityIdentity, entry: Entry) {
        if self.entries.insert(identity.clone(), entry).is_none() {
            self.order.push(identity);
        }
    }

    fn remove(&mut self, identity: &EntityIdentity) {
        if self.entries.remove(identity).is_some() {
            self.order.retain(|tracked| tracked != identity);
            self.loaded.retain(|(owner, _)| owner != identity);
        }
    }

    /// Attach a row read from the store
    ///
    /// An already-tracked row wins: the tracked state is kept and returned.
    pub fn attach(&mut self, entity: Box<dyn EntityObject>) -> &dyn EntityObject {
        let identity = entity.object_identity();
        if !self.entries.contains_key(&identity) {
            self.order.push(identity.clone());
        }
        self.entries
            .entry(identity)
            .or_insert_with(|| Entry::new(entity, EntryState::Unchanged))
            .entity
            .as_ref()
    }

    /// Attach a typed row and return the tracked version
    pub fn attach_typed<T: Entity>(&mut self, entity: T) -> T {
        let fallback = entity.clone();
        self.attach(Box::new(entity))
            .downcast_ref::<T>()
            .cloned()
            .unwrap_or(fallback)
    }

    /// Track a new row
    pub fn add(&mut self, entity: Box<dyn EntityObject>) -> RepositoryResult<()> {
        let identity = entity.object_identity();
        if let Some(existing) = self.entries.get(&identity) {
            if existing.state != EntryState::Deleted {
                return Err(RepositoryError::already_exists(
                    identity.entity_type,
                    identity.key.to_string(),
                )
                .with_operation(RepositoryOperation::Add));
            }
            // Re-adding a row scheduled for removal replaces it in place
            let mut entry = Entry::new(entity, EntryState::Modified);
            entry.original_deleted = existing.original_deleted;
            entry.original_stamp = existing.original_stamp.clone();
            self.insert(identity, entry);
            return Ok(());
        }
        self.insert(identity, Entry::new(entity, EntryState::Added));
        Ok(())
    }

    /// Record new state for a row
    ///
    /// Untracked rows are attached as modified, taking their current stamp
    /// as the expected one.
    pub fn update(&mut self, entity: Box<dyn EntityObject>) -> RepositoryResult<()> {
        let identity = entity.object_identity();
        match self.entries.get_mut(&identity) {
            Some(entry) if entry.state == EntryState::Deleted => Err(RepositoryError::new(
                RepositoryOperation::Update,
                RepositoryErrorKind::ValidationFailed,
                "Cannot update an entity scheduled for removal",
            )
            .with_entity(identity.entity_type, identity.key.to_string())),
            Some(entry) => {
                entry.state = match entry.state {
                    EntryState::Added => EntryState::Added,
                    EntryState::SoftDeleted if entity.is_marked_deleted() => EntryState::SoftDeleted,
                    _ => EntryState::Modified,
                };
                entry.entity = entity;
                Ok(())
            }
            None => {
                self.insert(identity, Entry::new(entity, EntryState::Modified));
                Ok(())
            }
        }
    }

    /// Set the soft-delete flag of a tracked row
    ///
    /// Returns `false` when the row is untracked, scheduled for removal or has
    /// no soft-delete facet.
    /// A row that was never persisted is simply forgotten.
    pub fn mark_soft_deleted(&mut self, identity: &EntityIdentity) -> bool {
        let Some(entry) = self.entries.get_mut(identity) else {
            return false;
        };
        match entry.state {
            EntryState::Added => {
                self.remove(identity);
                return true;
            }
            EntryState::Deleted => return false,
            _ => {}
        }
        let Some(facet) = entry.entity.soft_delete_state_mut() else {
            return false;
        };
        facet.is_deleted = true;
        entry.state = EntryState::SoftDeleted;
        true
    }

    /// Schedule physical removal of a tracked row
    pub fn mark_deleted(&mut self, identity: &EntityIdentity) -> bool {
        match self.entries.get(identity).map(Entry::state) {
            None => false,
            Some(EntryState::Added) => {
                self.remove(identity);
                true
            }
            Some(_) => {
                if let Some(entry) = self.entries.get_mut(identity) {
                    entry.state = EntryState::Deleted;
                }
                true
            }
        }
    }

    /// Whether `edge` of `owner` has been materialized
    pub fn is_loaded(&self, owner: &EntityIdentity, edge: &NavigationEdge) -> bool {
        self.loaded.contains(&(owner.clone(), edge.name))
    }

    /// Record that `edge` of `owner` has been materialized
    pub fn mark_loaded(&mut self, owner: &EntityIdentity, edge: &NavigationEdge) {
        self.loaded.insert((owner.clone(), edge.name));
    }

    /// Tracked rows `owner` reaches through `edge`
    pub fn tracked_related(
        &self,
        edge: &NavigationEdge,
        owner: &dyn EntityObject,
    ) -> Vec<EntityIdentity> {
        self.entries()
            .filter(|(_, entry)| edge.links(owner, entry.entity()))
            .map(|(identity, _)| identity.clone())
            .collect()
    }

    /// Pending writes in attach order
    pub fn change_set(&self) -> ChangeSet {
        let changes = self
            .entries()
            .filter_map(|(identity, entry)| {
                entry.change_kind().map(|kind| Change {
                    identity: identity.clone(),
                    kind,
                    entity: entry.entity.clone(),
                    original_deleted: entry.original_deleted,
                    expected_stamp: entry.original_stamp.clone(),
                })
            })
            .collect();
        ChangeSet { changes }
    }

    /// Adopt the persisted state after a successful save
    pub fn accept(&mut self, saved: ChangeSet) {
        for change in saved.changes {
            if change.kind == ChangeKind::Delete {
                self.remove(&change.identity);
                continue;
            }
            self.insert(
                change.identity,
                Entry::new(change.entity, EntryState::Unchanged),
            );
        }
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.loaded.clear();
    }
}
