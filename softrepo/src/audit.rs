//! Audit stamping
//!
//! Right before a save, the [`AuditApplier`] walks the pending change set and
//! fills in who and when: creation fields on inserts, modification fields on
//! updates, deletion fields when a row transitions to deleted, and a fresh
//! concurrency stamp on every persisted change. The caller identity comes from
//! an explicit [`IdentityProvider`], normally the session's [`AuditContext`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::entity::Capabilities;
use crate::ids::ConcurrencyStamp;
use crate::store::{ChangeKind, ChangeSet};

/// Source of the acting identity
///
/// Absence of an actor is valid; audit fields are then stamped with a time
/// and no actor.
pub trait IdentityProvider: Send + Sync {
    /// Id of the acting user or service
    fn actor(&self) -> Option<String>;

    /// Correlation id of the current request
    fn correlation_id(&self) -> Option<Uuid> {
        None
    }

    /// Id of the current session
    fn session_id(&self) -> Option<Uuid> {
        None
    }
}

/// Caller identity carried by a session
///
/// # Example
///
/// ```rust
/// use softrepo::audit::{AuditContext, IdentityProvider};
///
/// let context = AuditContext::default().with_actor("user_42");
/// assert_eq!(context.actor(), Some("user_42".to_string()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    /// Acting user or service
    pub actor: Option<String>,
    /// Correlation id of the current request
    pub correlation_id: Option<Uuid>,
    /// Id of the current session
    pub session_id: Option<Uuid>,
}

impl AuditContext {
    /// Set the actor
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the correlation id
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Set the session id
    #[must_use]
    pub fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

impl IdentityProvider for AuditContext {
    fn actor(&self) -> Option<String> {
        self.actor.clone()
    }

    fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }

    fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }
}

/// Stamps audit metadata onto a change set
pub struct AuditApplier<'a> {
    identity: &'a dyn IdentityProvider,
    now: DateTime<Utc>,
}

impl<'a> AuditApplier<'a> {
    /// Applier for one save, stamping `now`
    pub fn new(identity: &'a dyn IdentityProvider, now: DateTime<Utc>) -> Self {
        Self { identity, now }
    }

    /// Stamp every change; returns how many rows were touched
    pub fn apply(&self, changes: &mut ChangeSet) -> usize {
        let actor = self.identity.actor();
        let mut stamped = 0;

        for change in changes.iter_mut() {
            let entity = change.entity.as_mut();
            let capabilities = entity.capability_set();
            if capabilities.contains(Capabilities::AUDIT_EXEMPT) || change.kind == ChangeKind::Delete
            {
                continue;
            }

            if change.kind == ChangeKind::Insert {
                if let Some(creation) = entity.creation_state_mut() {
                    creation.creation_time = Some(self.now);
                    creation.creator_id = actor.clone();
                }
                if let Some(tags) = entity.correlation_state_mut() {
                    if tags.correlation_id.is_none() {
                        tags.correlation_id = self.identity.correlation_id();
                    }
                    if tags.session_id.is_none() {
                        tags.session_id = self.identity.session_id();
                    }
                }
            }

            if change.kind == ChangeKind::Update {
                if let Some(modification) = entity.modification_state_mut() {
                    modification.last_modification_time = Some(self.now);
                    modification.last_modifier_id = actor.clone();
                }
            }

            let original_deleted = change.original_deleted;
            if let Some(deletion) = entity.soft_delete_state_mut() {
                if deletion.is_deleted && !original_deleted {
                    deletion.deletion_time = Some(self.now);
                    deletion.deleter_id = actor.clone();
                }
            }

            if let Some(concurrency) = entity.concurrency_state_mut() {
                concurrency.stamp = Some(ConcurrencyStamp::new());
            }

            stamped += 1;
        }

        debug!(stamped, actor = ?actor, "Audit fields applied");
        stamped
    }
}
