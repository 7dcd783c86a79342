//! In-memory reference store
//!
//! Rows live in per-type tables keyed by [`KeyValue`], so the natural source
//! order is key order. All mutation happens under one write lock: a save
//! validates every change before applying any of them, and a transaction is a
//! snapshot of the tables taken at `begin`.
//!
//! The store enforces keys and concurrency stamps only. It does not enforce
//! referential integrity and does not cascade physical deletes.

use std::collections::{BTreeMap, HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{Change, ChangeKind, ChangeSet, Fetched, Store};
use crate::entity::{Capabilities, Entity, EntityIdentity, EntityObject, KeyValue};
use crate::metadata::NavigationEdge;
use crate::query::{QueryPlan, ResolvedInclude};
use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

type Table = BTreeMap<KeyValue, Box<dyn EntityObject>>;
type Tables = HashMap<&'static str, Table>;

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    snapshot: Option<Tables>,
}

impl State {
    fn rows_of<T: Entity>(&self, operation: RepositoryOperation) -> RepositoryResult<Vec<T>> {
        let Some(table) = self.tables.get(T::ENTITY_TYPE) else {
            return Ok(Vec::new());
        };
        table
            .values()
            .map(|row| {
                row.downcast_ref::<T>().cloned().ok_or_else(|| {
                    RepositoryError::database_error(
                        operation,
                        format!(
                            "Row stored under '{}' is a '{}'",
                            T::ENTITY_TYPE,
                            row.type_name()
                        ),
                    )
                })
            })
            .collect()
    }

    fn related(
        &self,
        edge: &NavigationEdge,
        owner: &dyn EntityObject,
        active_only: bool,
    ) -> Vec<Box<dyn EntityObject>> {
        let Some(table) = self.tables.get(edge.target_type) else {
            return Vec::new();
        };
        let admit = |row: &Box<dyn EntityObject>| !active_only || !row.is_marked_deleted();

        if edge.is_on_dependent {
            owner
                .foreign_key_value(edge.foreign_key)
                .and_then(|fk| table.get(&fk))
                .filter(|&row| admit(row))
                .map(|row| vec![row.clone()])
                .unwrap_or_default()
        } else {
            table
                .values()
                .filter(|&row| edge.links(owner, &**row) && admit(row))
                .cloned()
                .collect()
        }
    }

    fn load_includes<T: Entity>(
        &self,
        roots: &[T],
        includes: &[ResolvedInclude],
        active_only: bool,
    ) -> Vec<Box<dyn EntityObject>> {
        let mut seen: HashSet<EntityIdentity> = HashSet::new();
        let mut included = Vec::new();

        for include in includes {
            let mut frontier: Vec<Box<dyn EntityObject>> =
                roots.iter().map(EntityObject::clone_object).collect();

            for edge in &include.edges {
                let mut level_ids = HashSet::new();
                let mut next = Vec::new();
                for owner in &frontier {
                    for row in self.related(edge, &**owner, active_only) {
                        if level_ids.insert(row.object_identity()) {
                            next.push(row);
                        }
                    }
                }
                for row in &next {
                    if seen.insert(row.object_identity()) {
                        included.push(row.clone());
                    }
                }
                frontier = next;
            }
        }
        included
    }

    fn validate(&self, change: &Change) -> RepositoryResult<()> {
        let identity = &change.identity;
        let existing = self
            .tables
            .get(identity.entity_type)
            .and_then(|table| table.get(&identity.key));

        match (change.kind, existing) {
            (ChangeKind::Insert, Some(_)) => Err(RepositoryError::already_exists(
                identity.entity_type,
                identity.key.to_string(),
            )
            .with_operation(RepositoryOperation::Save)),
            (ChangeKind::Insert, None) => Ok(()),
            (_, None) => Err(
                RepositoryError::not_found(identity.entity_type, identity.key.to_string())
                    .with_operation(RepositoryOperation::Save),
            ),
            (_, Some(stored)) => {
                let tracked = change
                    .entity
                    .capability_set()
                    .contains(Capabilities::CONCURRENCY);
                if tracked && stored.stamp() != change.expected_stamp {
                    warn!(
                        entity_type = identity.entity_type,
                        entity_id = %identity.key,
                        "Concurrency stamp mismatch, rejecting save"
                    );
                    return Err(RepositoryError::concurrency_conflict(
                        identity.entity_type,
                        identity.key.to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn apply(&mut self, change: Change) {
        let Change { identity, kind, entity, .. } = change;
        let table = self.tables.entry(identity.entity_type).or_default();
        match kind {
            ChangeKind::Insert | ChangeKind::Update | ChangeKind::SoftDelete => {
                table.insert(identity.key, entity);
            }
            ChangeKind::Delete => {
                table.remove(&identity.key);
            }
        }
    }
}

/// Reference [`Store`] keeping every table in memory
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(MemoryStore::new());
/// store.seed(vec![order_one, order_two]).await;
/// let mut session = Session::new(store.clone(), registry, &config);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows as-is, bypassing the unit of work and auditing
    pub async fn seed<T: Entity>(&self, rows: impl IntoIterator<Item = T>) {
        let mut state = self.state.write().await;
        let table = state.tables.entry(T::ENTITY_TYPE).or_default();
        for row in rows {
            table.insert(row.key(), Box::new(row));
        }
    }

    /// Every stored row of `T` in key order, deleted rows included
    pub async fn rows<T: Entity>(&self) -> RepositoryResult<Vec<T>> {
        self.state.read().await.rows_of::<T>(RepositoryOperation::List)
    }

    /// Whether a transaction is open
    pub async fn in_transaction(&self) -> bool {
        self.state.read().await.snapshot.is_some()
    }
}

impl Store for MemoryStore {
    async fn fetch<T: Entity>(&self, plan: &QueryPlan<T>) -> RepositoryResult<Fetched<T>> {
        let state = self.state.read().await;
        let rows = plan.evaluate(state.rows_of::<T>(RepositoryOperation::Find)?);
        let included = state.load_includes(&rows, &plan.includes, !plan.with_deleted);
        debug!(
            entity_type = T::ENTITY_TYPE,
            rows = rows.len(),
            included = included.len(),
            "Fetched rows"
        );
        Ok(Fetched { rows, included })
    }

    async fn count<T: Entity>(&self, plan: &QueryPlan<T>) -> RepositoryResult<u64> {
        let state = self.state.read().await;
        let rows = state.rows_of::<T>(RepositoryOperation::Count)?;
        Ok(rows.iter().filter(|row| plan.admits(row)).count() as u64)
    }

    async fn any<T: Entity>(&self, plan: &QueryPlan<T>) -> RepositoryResult<bool> {
        let state = self.state.read().await;
        let rows = state.rows_of::<T>(RepositoryOperation::Any)?;
        Ok(rows.iter().any(|row| plan.admits(row)))
    }

    async fn load_related(
        &self,
        edge: &NavigationEdge,
        owner: &dyn EntityObject,
        active_only: bool,
    ) -> RepositoryResult<Vec<Box<dyn EntityObject>>> {
        let state = self.state.read().await;
        let rows = state.related(edge, owner, active_only);
        debug!(
            navigation = edge.name,
            owner = %owner.object_identity(),
            rows = rows.len(),
            "Loaded related rows"
        );
        Ok(rows)
    }

    async fn save(&self, changes: ChangeSet) -> RepositoryResult<u64> {
        let mut state = self.state.write().await;
        for change in changes.iter() {
            state.validate(change)?;
        }
        let written = changes.len() as u64;
        for change in changes.changes {
            state.apply(change);
        }
        debug!(written, "Change set applied");
        Ok(written)
    }

    async fn begin(&self) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        if state.snapshot.is_some() {
            return Err(RepositoryError::transaction_failed(
                "A transaction is already active",
            ));
        }
        state.snapshot = Some(state.tables.clone());
        debug!("Transaction started");
        Ok(())
    }

    async fn commit(&self) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        state
            .snapshot
            .take()
            .ok_or_else(|| RepositoryError::transaction_failed("No active transaction to commit"))?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        let snapshot = state.snapshot.take().ok_or_else(|| {
            RepositoryError::transaction_failed("No active transaction to roll back")
        })?;
        state.tables = snapshot;
        debug!("Transaction rolled back");
        Ok(())
    }
}
