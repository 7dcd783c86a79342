//! Repository trait definitions
//!
//! The repository surface is split the way callers use it:
//!
//! - [`ReadRepository`]: single-row fetches, sequences, pages, `any` and `count`
//! - [`WriteRepository`]: tracking adds, updates and deletes, then saving
//! - [`KeyedRepository`]: key lookups for entities with a surrogate key
//!
//! Async methods use RPITIT (Return Position Impl Trait In Traits), so
//! implementations write plain `async fn` without `async_trait`. Every method
//! takes `&mut self` because reads attach rows to the session's unit of work.
//!
//! # Example
//!
//! ```rust,ignore
//! use softrepo::repository::{ReadQuery, ReadRepository, WriteRepository};
//!
//! let mut orders = session.repository::<Order>();
//! let open = orders
//!     .get_all(ReadQuery::new().filter(|o: &Order| o.status == "open"))
//!     .await?;
//! for order in open {
//!     orders.delete(order).await?;
//! }
//! orders.save_changes().await?;
//! ```

use std::future::Future;

use super::error::RepositoryError;
use super::options::ReadQuery;
use super::pagination::{PageRequest, PageableResponse};
use crate::cascade::DeleteOutcome;
use crate::entity::{Entity, KeyedEntity};
use crate::query::SortRequest;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Read operations over one entity type
///
/// Unless a query asks for deleted rows, soft-deleted rows are invisible to
/// every method here.
pub trait ReadRepository<T: Entity>: Send {
    /// Exactly one row: the first match in query order
    ///
    /// Fails with `NotFound` when nothing matches.
    fn get(&mut self, query: ReadQuery<T>) -> impl Future<Output = RepositoryResult<T>> + Send;

    /// The first match in query order, if any
    fn find(
        &mut self,
        query: ReadQuery<T>,
    ) -> impl Future<Output = RepositoryResult<Option<T>>> + Send;

    /// Alias of [`find`](ReadRepository::find)
    fn first_or_default(
        &mut self,
        query: ReadQuery<T>,
    ) -> impl Future<Output = RepositoryResult<Option<T>>> + Send;

    /// The only match, if any
    ///
    /// Fails with `AmbiguousMatch` when more than one row matches.
    fn single_or_default(
        &mut self,
        query: ReadQuery<T>,
    ) -> impl Future<Output = RepositoryResult<Option<T>>> + Send;

    /// Every match in query order
    fn get_all(
        &mut self,
        query: ReadQuery<T>,
    ) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send;

    /// One page of matches plus totals
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let page = orders
    ///     .get_list(ReadQuery::new().sort_by("created_at", SortOrder::Desc), PageRequest::index(0, 20))
    ///     .await?;
    /// println!("{} of {}", page.data.len(), page.meta.total_count);
    /// ```
    fn get_list(
        &mut self,
        query: ReadQuery<T>,
        page: PageRequest,
    ) -> impl Future<Output = RepositoryResult<PageableResponse<T>>> + Send;

    /// One page ordered by named fields
    ///
    /// Unknown fields fail with `InvalidSortField` before the store is called.
    fn get_list_with_sort(
        &mut self,
        query: ReadQuery<T>,
        sort: Vec<SortRequest>,
        page: PageRequest,
    ) -> impl Future<Output = RepositoryResult<PageableResponse<T>>> + Send;

    /// Whether any row matches
    fn any(&mut self, query: ReadQuery<T>) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Number of matching rows
    fn count(&mut self, query: ReadQuery<T>) -> impl Future<Output = RepositoryResult<u64>> + Send;
}

/// Key lookups
pub trait KeyedRepository<T: KeyedEntity>: ReadRepository<T> {
    /// The row with `key`; fails with `NotFound` naming the key
    fn get_by_key(
        &mut self,
        key: T::Key,
        query: ReadQuery<T>,
    ) -> impl Future<Output = RepositoryResult<T>> + Send;

    /// The row with `key`, if any
    fn find_by_key(
        &mut self,
        key: T::Key,
        query: ReadQuery<T>,
    ) -> impl Future<Output = RepositoryResult<Option<T>>> + Send;

    /// Soft-delete the row with `key`, loading it first
    fn delete_by_key(
        &mut self,
        key: T::Key,
    ) -> impl Future<Output = RepositoryResult<DeleteOutcome>> + Send;
}

/// Write operations over one entity type
///
/// Writes only change tracked state. Nothing reaches the store until
/// [`save_changes`](WriteRepository::save_changes).
pub trait WriteRepository<T: Entity>: Send {
    /// Track a new row
    fn add(&mut self, entity: T) -> RepositoryResult<()>;

    /// Track several new rows, stopping at the first failure
    fn add_range(&mut self, entities: Vec<T>) -> RepositoryResult<()>;

    /// Track a modified row
    fn update(&mut self, entity: T) -> RepositoryResult<()>;

    /// Track several modified rows, stopping at the first failure
    fn update_range(&mut self, entities: Vec<T>) -> RepositoryResult<()>;

    /// Soft-delete a row and cascade to its dependents
    ///
    /// Types without soft-delete support are removed instead.
    fn delete(&mut self, entity: T)
        -> impl Future<Output = RepositoryResult<DeleteOutcome>> + Send;

    /// Soft-delete each row in turn
    ///
    /// Stops at the first failure; rows already handled stay marked.
    fn delete_range(
        &mut self,
        entities: Vec<T>,
    ) -> impl Future<Output = RepositoryResult<Vec<DeleteOutcome>>> + Send;

    /// Schedule a row for physical removal, bypassing soft delete
    fn delete_permanently(
        &mut self,
        entity: T,
    ) -> impl Future<Output = RepositoryResult<DeleteOutcome>> + Send;

    /// Schedule several rows for physical removal
    fn delete_range_permanently(
        &mut self,
        entities: Vec<T>,
    ) -> impl Future<Output = RepositoryResult<Vec<DeleteOutcome>>> + Send;

    /// Persist all tracked changes of the session
    fn save_changes(&mut self) -> impl Future<Output = RepositoryResult<u64>> + Send;
}
