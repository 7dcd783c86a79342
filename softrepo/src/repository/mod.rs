//! Repository surface over a session
//!
//! # Features
//!
//! - **Reads**: [`ReadRepository`] for get, find, sequences, pages, `any` and `count`
//! - **Writes**: [`WriteRepository`] for tracked adds, updates and soft-delete cascades
//! - **Keys**: [`KeyedRepository`] for lookups by surrogate key
//! - **Query options**: [`ReadQuery`] for predicates, includes, sorting and tracking
//! - **Pagination**: [`PageRequest`] in, [`PageableResponse`] with [`PageMeta`] out
//!
//! # Example
//!
//! ```rust,ignore
//! use softrepo::prelude::*;
//!
//! let mut session = Session::new(store, registry, &config.repository);
//! let page = session
//!     .repository::<Order>()
//!     .get_list_with_sort(
//!         ReadQuery::new().filter(|o: &Order| o.active),
//!         vec![SortRequest::asc("status"), SortRequest::desc("created_at")],
//!         PageRequest::index(0, 20),
//!     )
//!     .await?;
//! ```

mod error;
mod facade;
mod options;
mod pagination;
mod traits;

// Re-export all public types
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use facade::Repository;
pub use options::ReadQuery;
pub use pagination::{PageMeta, PageRequest, PageWindow, PageableResponse};
pub use traits::{KeyedRepository, ReadRepository, RepositoryResult, WriteRepository};
