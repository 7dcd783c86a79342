//! Sessions: one unit of work over one store
//!
//! A [`Session`] owns everything a save-changes boundary needs: the store
//! handle, the model registry, the unit of work, the caller's audit identity
//! and a cancellation token raced against every store call. Per-type
//! repositories borrow the session mutably, so only one of them is active at
//! a time.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut session = Session::new(store, registry, &config.repository)
//!     .with_audit_context(AuditContext::default().with_actor("user_42"));
//!
//! let order = session.repository::<Order>().get_by_key(42, ReadQuery::new()).await?;
//! session.repository::<Order>().delete(order).await?;
//! session.save_changes().await?;
//! ```

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::audit::{AuditApplier, AuditContext};
use crate::cascade::{CascadeResolver, DeleteOutcome};
use crate::config::RepositoryConfig;
use crate::entity::{Entity, EntityObject};
use crate::metadata::ModelRegistry;
use crate::query::{OrderBy, Predicate, QueryPlan};
use crate::repository::{ReadQuery, Repository, RepositoryError, RepositoryOperation, RepositoryResult};
use crate::store::{cancellable, Store};
use crate::unit_of_work::UnitOfWork;

/// One unit of work over one store
pub struct Session<S> {
    store: Arc<S>,
    registry: Arc<ModelRegistry>,
    unit_of_work: UnitOfWork,
    audit: AuditContext,
    settings: RepositoryConfig,
    cancellation: CancellationToken,
    in_transaction: bool,
}

impl<S: Store> Session<S> {
    /// Create a session
    pub fn new(store: Arc<S>, registry: Arc<ModelRegistry>, settings: &RepositoryConfig) -> Self {
        Self {
            store,
            registry,
            unit_of_work: UnitOfWork::new(),
            audit: AuditContext::default(),
            settings: settings.clone(),
            cancellation: CancellationToken::new(),
            in_transaction: false,
        }
    }

    /// Set the caller identity used by the audit pass
    #[must_use]
    pub fn with_audit_context(mut self, audit: AuditContext) -> Self {
        self.audit = audit;
        self
    }

    /// Set the token raced against store calls that take no per-call token
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Replace the caller identity
    pub fn set_audit_context(&mut self, audit: AuditContext) {
        self.audit = audit;
    }

    /// Caller identity
    pub fn audit_context(&self) -> &AuditContext {
        &self.audit
    }

    /// Model registry
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Store handle
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Tracked state
    pub fn unit_of_work(&self) -> &UnitOfWork {
        &self.unit_of_work
    }

    /// Repository settings
    pub fn settings(&self) -> &RepositoryConfig {
        &self.settings
    }

    /// Session-wide cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Forget all tracked state
    pub fn clear(&mut self) {
        self.unit_of_work.clear();
    }

    /// Repository for entity type `T`
    pub fn repository<T: Entity>(&mut self) -> Repository<'_, T, S> {
        Repository::new(self)
    }

    pub(crate) fn unit_of_work_mut(&mut self) -> &mut UnitOfWork {
        &mut self.unit_of_work
    }

    /// Compose a query into a validated plan
    ///
    /// Include paths, named filters and sort fields are resolved here, so
    /// every build error surfaces before the store is called.
    pub(crate) fn plan<T: Entity>(&self, query: &ReadQuery<T>) -> RepositoryResult<QueryPlan<T>> {
        let includes = query
            .includes
            .iter()
            .map(|path| self.registry.resolve_include(T::ENTITY_TYPE, path))
            .collect::<RepositoryResult<Vec<_>>>()?;

        let named = if query.conditions.is_empty() {
            None
        } else {
            Some(Predicate::<T>::from_conditions(&query.conditions)?)
        };
        let predicate = match (query.predicate.clone(), named) {
            (Some(closure), Some(named)) => Some(closure.and(named)),
            (closure, named) => closure.or(named),
        };

        let compiled = OrderBy::<T>::compile(&query.sort)?;
        let order = match (compiled, query.order.clone()) {
            (Some(sort), Some(custom)) => Some(sort.then(custom)),
            (sort, custom) => sort.or(custom),
        };

        Ok(QueryPlan {
            tracking: query.tracking.unwrap_or(self.settings.tracking_by_default),
            includes,
            with_deleted: query.with_deleted,
            predicate,
            order,
            skip: None,
            take: None,
        })
    }

    /// Run a plan, attaching results when the plan tracks
    pub(crate) async fn fetch<T: Entity>(
        &mut self,
        plan: &QueryPlan<T>,
        cancel: &CancellationToken,
        operation: RepositoryOperation,
    ) -> RepositoryResult<Vec<T>> {
        let fetched = cancellable(cancel, operation, self.store.fetch(plan)).await?;

        if !plan.tracking {
            return Ok(fetched.rows);
        }

        for entity in fetched.included {
            self.unit_of_work.attach(entity);
        }
        let first_edges: Vec<_> = plan
            .includes
            .iter()
            .filter_map(|include| include.edges.first())
            .collect();
        let mut tracked = Vec::with_capacity(fetched.rows.len());
        for row in fetched.rows {
            let identity = row.identity();
            for edge in &first_edges {
                self.unit_of_work.mark_loaded(&identity, edge);
            }
            tracked.push(self.unit_of_work.attach_typed(row));
        }
        Ok(tracked)
    }

    pub(crate) async fn count<T: Entity>(
        &self,
        plan: &QueryPlan<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<u64> {
        cancellable(cancel, RepositoryOperation::Count, self.store.count(plan)).await
    }

    pub(crate) async fn any<T: Entity>(
        &self,
        plan: &QueryPlan<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<bool> {
        cancellable(cancel, RepositoryOperation::Any, self.store.any(plan)).await
    }

    pub(crate) async fn delete(
        &mut self,
        entity: Box<dyn EntityObject>,
        permanent: bool,
    ) -> RepositoryResult<DeleteOutcome> {
        let resolver = CascadeResolver::new(&*self.store, &self.registry, &self.cancellation);
        resolver
            .delete(&mut self.unit_of_work, entity, permanent)
            .await
    }

    /// Load a navigation of a tracked or detached owner explicitly
    ///
    /// Loaded rows are attached and the navigation is recorded as loaded,
    /// so a later cascade uses the tracked rows instead of reloading.
    pub async fn load_navigation<T: Entity, R: Entity>(
        &mut self,
        owner: &T,
        navigation: &str,
    ) -> RepositoryResult<Vec<R>> {
        let edge = self
            .registry
            .require(T::ENTITY_TYPE)?
            .navigation(navigation)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::validation_failed(
                    RepositoryOperation::LoadRelated,
                    format!("'{}' has no navigation '{navigation}'", T::ENTITY_TYPE),
                )
            })?;
        if edge.target_type != R::ENTITY_TYPE {
            return Err(RepositoryError::validation_failed(
                RepositoryOperation::LoadRelated,
                format!(
                    "Navigation '{navigation}' targets '{}', not '{}'",
                    edge.target_type,
                    R::ENTITY_TYPE
                ),
            ));
        }

        let rows = cancellable(
            &self.cancellation,
            RepositoryOperation::LoadRelated,
            self.store.load_related(&edge, owner, true),
        )
        .await?;

        self.unit_of_work.mark_loaded(&owner.identity(), &edge);
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                self.unit_of_work
                    .attach(row)
                    .downcast_ref::<R>()
                    .cloned()
            })
            .collect())
    }

    /// Audit and persist every pending change atomically
    ///
    /// On failure or cancellation nothing is written and the unit of work
    /// keeps its pending state.
    pub async fn save_changes(&mut self) -> RepositoryResult<u64> {
        if !self.unit_of_work.has_changes() {
            return Ok(0);
        }

        let mut changes = self.unit_of_work.change_set();
        if self.settings.audit_enabled {
            AuditApplier::new(&self.audit, Utc::now()).apply(&mut changes);
        }

        let written = cancellable(
            &self.cancellation,
            RepositoryOperation::Save,
            self.store.save(changes.clone()),
        )
        .await?;

        self.unit_of_work.accept(changes);
        info!(written, "Changes saved");
        Ok(written)
    }

    /// Open a transaction spanning several saves
    pub async fn begin(&mut self) -> RepositoryResult<()> {
        cancellable(
            &self.cancellation,
            RepositoryOperation::Transaction,
            self.store.begin(),
        )
        .await?;
        self.in_transaction = true;
        debug!("Session transaction opened");
        Ok(())
    }

    /// Commit the open transaction
    pub async fn commit(&mut self) -> RepositoryResult<()> {
        cancellable(
            &self.cancellation,
            RepositoryOperation::Transaction,
            self.store.commit(),
        )
        .await?;
        self.in_transaction = false;
        debug!("Session transaction committed");
        Ok(())
    }

    /// Roll back the open transaction and drop tracked state
    pub async fn rollback(&mut self) -> RepositoryResult<()> {
        cancellable(
            &self.cancellation,
            RepositoryOperation::Transaction,
            self.store.rollback(),
        )
        .await?;
        self.in_transaction = false;
        self.unit_of_work.clear();
        debug!("Session transaction rolled back");
        Ok(())
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tracked", &self.unit_of_work.len())
            .field("audit", &self.audit)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}
