//! Capability facets carried by entities
//!
//! Each facet is a plain struct embedded in the entity. The entity type
//! declares which facets it has through [`Capabilities`] and hands out
//! references through the accessors of [`Entity`](super::Entity).

use std::ops::BitOr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::ConcurrencyStamp;

/// Statically declared set of facets an entity type carries
///
/// # Example
///
/// ```rust
/// use softrepo::entity::Capabilities;
///
/// const CAPS: Capabilities = Capabilities::SOFT_DELETE.union(Capabilities::CREATION_AUDITED);
/// assert!(CAPS.contains(Capabilities::SOFT_DELETE));
/// assert!(!CAPS.contains(Capabilities::CONCURRENCY));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// No facets
    pub const NONE: Self = Self(0);
    /// [`SoftDelete`] facet
    pub const SOFT_DELETE: Self = Self(1);
    /// [`CreationAudit`] facet
    pub const CREATION_AUDITED: Self = Self(1 << 1);
    /// [`ModificationAudit`] facet
    pub const MODIFICATION_AUDITED: Self = Self(1 << 2);
    /// [`Concurrency`] facet
    pub const CONCURRENCY: Self = Self(1 << 3);
    /// [`CorrelationTags`] facet
    pub const CORRELATION: Self = Self(1 << 4);
    /// Opt-out marker: the audit pass skips this type entirely
    pub const AUDIT_EXEMPT: Self = Self(1 << 5);

    /// Creation, modification and soft delete together
    pub const FULLY_AUDITED: Self = Self::SOFT_DELETE
        .union(Self::CREATION_AUDITED)
        .union(Self::MODIFICATION_AUDITED);

    /// Combine two capability sets
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether every facet in `other` is present
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// Soft-delete state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDelete {
    /// Whether the row is logically deleted
    pub is_deleted: bool,
    /// When the row was marked deleted
    pub deletion_time: Option<DateTime<Utc>>,
    /// Who marked the row deleted
    pub deleter_id: Option<String>,
}

/// Creation audit fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationAudit {
    /// When the row was first persisted
    pub creation_time: Option<DateTime<Utc>>,
    /// Who created the row
    pub creator_id: Option<String>,
}

/// Modification audit fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationAudit {
    /// When the row was last modified
    pub last_modification_time: Option<DateTime<Utc>>,
    /// Who last modified the row
    pub last_modifier_id: Option<String>,
}

/// Optimistic concurrency token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concurrency {
    /// Current stamp; rotated on every persisted change
    pub stamp: Option<ConcurrencyStamp>,
}

/// Correlation tags copied from the caller context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationTags {
    /// Correlation id of the request that created the row
    pub correlation_id: Option<Uuid>,
    /// Session the row was written in
    pub session_id: Option<Uuid>,
    /// Snapshot the row belongs to; owned by the application
    pub snapshot_id: Option<Uuid>,
}
