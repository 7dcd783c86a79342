//! Repository error types
//!
//! Every failure surfaced by a session, a repository or a store is a
//! [`RepositoryError`]: an operation, a kind and optional entity context.
//! Stores build these values themselves, so the facade propagates them
//! unchanged with `?`.
//!
//! # Example
//!
//! ```rust
//! use softrepo::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("Order", "42");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Fetching exactly one entity
    Get,
    /// Fetching an optional entity (find, first-or-default, single-or-default)
    Find,
    /// Fetching a sequence or a page of entities
    List,
    /// Counting entities matching a predicate
    Count,
    /// Checking whether any entity matches a predicate
    Any,
    /// Compiling a query (sort, filter, includes, paging)
    BuildQuery,
    /// Tracking a new entity
    Add,
    /// Tracking a modified entity
    Update,
    /// Deleting an entity (soft or permanent)
    Delete,
    /// Loading a navigation that was not materialized
    LoadRelated,
    /// Persisting the unit of work
    Save,
    /// Transaction control (begin, commit, rollback)
    Transaction,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Find => write!(f, "find"),
            Self::List => write!(f, "list"),
            Self::Count => write!(f, "count"),
            Self::Any => write!(f, "any"),
            Self::BuildQuery => write!(f, "build_query"),
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::LoadRelated => write!(f, "load_related"),
            Self::Save => write!(f, "save"),
            Self::Transaction => write!(f, "transaction"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// A required single-entity fetch matched zero rows
    NotFound,
    /// A single-or-default fetch matched more than one row
    AmbiguousMatch,
    /// A sort field does not name a registered field of the entity
    InvalidSortField,
    /// Page size is not positive
    InvalidPagination,
    /// Soft delete refused for an entity in an unsafe one-to-one relationship
    UnsafeOneToOneSoftDelete,
    /// The stored concurrency token no longer matches the tracked one
    ConcurrencyConflict,
    /// Entity already exists (duplicate key)
    AlreadyExists,
    /// Validation failed before touching the store
    ValidationFailed,
    /// Transaction misuse or failure
    TransactionFailed,
    /// The caller cancelled the operation
    Cancelled,
    /// Failed to connect to the store
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Underlying store error
    DatabaseError,
    /// Serialization or deserialization error
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AmbiguousMatch => write!(f, "ambiguous_match"),
            Self::InvalidSortField => write!(f, "invalid_sort_field"),
            Self::InvalidPagination => write!(f, "invalid_pagination"),
            Self::UnsafeOneToOneSoftDelete => write!(f, "unsafe_one_to_one_soft_delete"),
            Self::ConcurrencyConflict => write!(f, "concurrency_conflict"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::TransactionFailed => write!(f, "transaction_failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
///
/// # Example
///
/// ```rust
/// use softrepo::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::invalid_sort_field("Order", "colour");
/// assert_eq!(error.operation, RepositoryOperation::BuildQuery);
/// assert!(!error.is_retriable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Order")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    ///
    /// # Example
    ///
    /// ```rust
    /// use softrepo::repository::RepositoryError;
    ///
    /// let error = RepositoryError::not_found("Order", "42");
    /// assert_eq!(error.entity_type, Some("Order".to_string()));
    /// ```
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Get,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create a "no row matched the predicate" error
    pub fn no_match(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::new(
                RepositoryOperation::Get,
                RepositoryErrorKind::NotFound,
                "No entity matched the query",
            )
        }
    }

    /// Create an ambiguous match error for single-or-default lookups
    pub fn ambiguous_match(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::new(
                RepositoryOperation::Find,
                RepositoryErrorKind::AmbiguousMatch,
                "More than one entity matched the query",
            )
        }
    }

    /// Create an error for a sort field the entity does not expose
    pub fn invalid_sort_field(entity_type: impl Into<String>, field: &str) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Self::new(
                RepositoryOperation::BuildQuery,
                RepositoryErrorKind::InvalidSortField,
                format!("Unknown sort field '{field}'"),
            )
        }
    }

    /// Create an invalid pagination error
    pub fn invalid_pagination(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::BuildQuery,
            RepositoryErrorKind::InvalidPagination,
            message,
        )
    }

    /// Create the error raised when a soft delete would leave an occupied one-to-one key
    pub fn unsafe_one_to_one(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        navigation: &str,
    ) -> Self {
        Self::new(
            RepositoryOperation::Delete,
            RepositoryErrorKind::UnsafeOneToOneSoftDelete,
            format!(
                "Entity has a one-to-one relationship through '{navigation}'; \
                 soft delete would block re-creation with the same foreign key"
            ),
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create a concurrency conflict error
    pub fn concurrency_conflict(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(
            RepositoryOperation::Save,
            RepositoryErrorKind::ConcurrencyConflict,
            "Entity was modified by another writer",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an "already exists" error with entity context
    pub fn already_exists(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Save,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, identifier)
    }

    /// Create a validation failed error
    pub fn validation_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    /// Create a transaction error
    pub fn transaction_failed(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Transaction,
            RepositoryErrorKind::TransactionFailed,
            message,
        )
    }

    /// Create a cancellation error
    pub fn cancelled(operation: RepositoryOperation) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::Cancelled,
            "Operation cancelled by caller",
        )
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ConnectionFailed, message)
    }

    /// Create a timeout error
    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Create a serialization error
    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is transient
    ///
    /// Nothing in this crate retries; the classification is for callers
    /// that own a retry policy.
    ///
    /// # Example
    ///
    /// ```rust
    /// use softrepo::repository::{RepositoryError, RepositoryOperation};
    ///
    /// let reset = RepositoryError::connection_failed(RepositoryOperation::List, "reset");
    /// assert!(reset.is_retriable());
    ///
    /// let conflict = RepositoryError::concurrency_conflict("Order", "1");
    /// assert!(!conflict.is_retriable());
    /// ```
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }

    /// Check whether this error reports a missing entity
    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{entity_type}: {entity_id}]"),
            (Some(entity_type), None) => write!(f, " [{entity_type}]"),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = RepositoryError::not_found("Order", "42");
        assert_eq!(
            error.to_string(),
            "Repository not_found error during get: Entity not found [Order: 42]"
        );
    }

    #[test]
    fn test_type_only_context_display() {
        let error = RepositoryError::ambiguous_match("Order");
        assert_eq!(
            error.to_string(),
            "Repository ambiguous_match error during find: \
             More than one entity matched the query [Order]"
        );
    }

    #[test]
    fn test_with_operation_overrides() {
        let error = RepositoryError::not_found("Order", "1").with_operation(RepositoryOperation::Delete);
        assert_eq!(error.operation, RepositoryOperation::Delete);
        assert!(error.is_not_found());
    }

    #[test]
    fn test_retriable_kinds() {
        assert!(RepositoryError::timeout(RepositoryOperation::Save, "slow").is_retriable());
        assert!(!RepositoryError::cancelled(RepositoryOperation::Save).is_retriable());
        assert!(!RepositoryError::invalid_pagination("size").is_retriable());
    }

    #[test]
    fn test_unsafe_one_to_one_mentions_navigation() {
        let error = RepositoryError::unsafe_one_to_one("Profile", "7", "account");
        assert_eq!(error.kind, RepositoryErrorKind::UnsafeOneToOneSoftDelete);
        assert!(error.message.contains("'account'"));
    }
}
