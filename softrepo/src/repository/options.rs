//! Read query options
//!
//! [`ReadQuery`] collects everything a read can be shaped by: an in-process
//! predicate, named filter conditions, include paths, sort requests or a
//! custom ordering, the deleted-row switch, tracking and a cancellation token.
//! Nothing is validated here; the session compiles the options into a
//! [`QueryPlan`](crate::query::QueryPlan) and reports build errors before
//! touching the store.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::query::{FilterCondition, OrderBy, Predicate, SortOrder, SortRequest};

/// Options for one read
///
/// # Example
///
/// ```rust,ignore
/// let query = ReadQuery::<Order>::new()
///     .filter(|o| o.status == "open")
///     .include("lines")
///     .sort_by("created_at", SortOrder::Desc)
///     .as_no_tracking();
/// ```
#[must_use]
pub struct ReadQuery<T> {
    pub(crate) predicate: Option<Predicate<T>>,
    pub(crate) conditions: Vec<FilterCondition>,
    pub(crate) includes: Vec<String>,
    pub(crate) sort: Vec<SortRequest>,
    pub(crate) order: Option<OrderBy<T>>,
    pub(crate) with_deleted: bool,
    pub(crate) tracking: Option<bool>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl<T> Default for ReadQuery<T> {
    fn default() -> Self {
        Self {
            predicate: None,
            conditions: Vec::new(),
            includes: Vec::new(),
            sort: Vec::new(),
            order: None,
            with_deleted: false,
            tracking: None,
            cancel: None,
        }
    }
}

impl<T> Clone for ReadQuery<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            conditions: self.conditions.clone(),
            includes: self.includes.clone(),
            sort: self.sort.clone(),
            order: self.order.clone(),
            with_deleted: self.with_deleted,
            tracking: self.tracking,
            cancel: self.cancel.clone(),
        }
    }
}

impl<T> fmt::Debug for ReadQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadQuery")
            .field("predicate", &self.predicate.is_some())
            .field("conditions", &self.conditions)
            .field("includes", &self.includes)
            .field("sort", &self.sort)
            .field("custom_order", &self.order.is_some())
            .field("with_deleted", &self.with_deleted)
            .field("tracking", &self.tracking)
            .finish()
    }
}

impl<T: 'static> ReadQuery<T> {
    /// Empty query: every active row, tracking per configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows matching `test`; repeated calls are and-ed
    pub fn filter<F>(self, test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicate(Predicate::new(test))
    }

    /// Keep rows matching a prepared predicate; repeated calls are and-ed
    pub fn predicate(mut self, predicate: Predicate<T>) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Keep rows matching a named filter condition
    pub fn condition(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Keep rows matching every named filter condition
    pub fn conditions(mut self, conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// Eagerly load a dotted navigation path
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(path.into());
        self
    }

    /// Order by named fields, first request most significant
    pub fn order_by(mut self, requests: impl IntoIterator<Item = SortRequest>) -> Self {
        self.sort.extend(requests);
        self
    }

    /// Order by one named field
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push(SortRequest::new(field, order));
        self
    }

    /// Order with a custom comparator, applied after any named sorts
    pub fn order_with(mut self, order: OrderBy<T>) -> Self {
        self.order = Some(match self.order.take() {
            Some(existing) => existing.then(order),
            None => order,
        });
        self
    }

    /// Also return soft-deleted rows
    pub fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }

    /// Return detached copies that are not tracked
    pub fn as_no_tracking(self) -> Self {
        self.tracking(false)
    }

    /// Override the configured tracking default
    pub fn tracking(mut self, tracking: bool) -> Self {
        self.tracking = Some(tracking);
        self
    }

    /// Race this read against `cancel` instead of the session token
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether named sorts or a custom order are present
    pub fn is_ordered(&self) -> bool {
        !self.sort.is_empty() || self.order.is_some()
    }
}
