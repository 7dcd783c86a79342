//! # softrepo
//!
//! Generic data-access layer with composable queries, pagination and
//! soft-delete cascades over an abstract transactional store.
//!
//! ## Features
//!
//! - **Query composition**: tracking, includes, deleted-row bypass, predicates,
//!   multi-field sorting and paging applied in one fixed order
//! - **Soft-delete cascade**: principal-to-dependent traversal driven by
//!   relationship metadata, with lazy loading of unmaterialized navigations
//! - **Unit of work**: identity map, entry states and optimistic concurrency
//! - **Audit stamping**: creation, modification and deletion metadata from an
//!   explicit caller identity
//! - **Reference store**: in-memory store with atomic saves and snapshot
//!   transactions
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use softrepo::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let registry = Arc::new(
//!         ModelRegistry::builder()
//!             .register::<Order>()
//!             .register::<OrderLine>()
//!             .build()?,
//!     );
//!     let store = Arc::new(MemoryStore::new());
//!     let mut session = Session::new(store, registry, &config.repository)
//!         .with_audit_context(AuditContext::default().with_actor("user_42"));
//!
//!     let mut orders = session.repository::<Order>();
//!     let order = orders.get_by_key(42, ReadQuery::new()).await?;
//!     orders.delete(order).await?;
//!     orders.save_changes().await?;
//!
//!     shutdown_tracing();
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod observability;
pub mod query;
pub mod repository;
pub mod session;
pub mod store;
pub mod unit_of_work;

mod cascade;

#[cfg(test)]
mod testing;

pub use cascade::DeleteOutcome;

/// Commonly used types
pub mod prelude {
    pub use crate::audit::{AuditContext, IdentityProvider};
    pub use crate::config::{Config, RepositoryConfig};
    pub use crate::entity::{Capabilities, Entity, EntityIdentity, KeyValue, KeyedEntity};
    pub use crate::error::{Error, Result};
    pub use crate::metadata::{CascadeBehavior, EntityModel, ModelRegistry, NavigationEdge};
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::query::{FieldRegistry, FilterCondition, OrderBy, Predicate, SortOrder, SortRequest};
    pub use crate::repository::{
        KeyedRepository, PageMeta, PageRequest, PageableResponse, ReadQuery, ReadRepository,
        Repository, RepositoryError, RepositoryErrorKind, RepositoryResult, WriteRepository,
    };
    pub use crate::session::Session;
    pub use crate::store::{MemoryStore, Store};
    pub use crate::DeleteOutcome;
}
