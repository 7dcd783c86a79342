//! Query plan: the composed, validated form of a read
//!
//! A plan records every pipeline step. Stores consume it in a fixed order:
//!
//! 1. tracking mode (consumed by the session after the fetch)
//! 2. eager-load paths
//! 3. active-record filter, unless `with_deleted`
//! 4. caller predicate
//! 5. ordering
//! 6. skip / take
//!
//! Steps 3 to 6 are pure and live in [`QueryPlan::evaluate`], so every store
//! applies them identically.

use std::fmt;

use super::{OrderBy, Predicate, ResolvedInclude};
use crate::entity::Entity;

/// Composed read over entity type `T`
pub struct QueryPlan<T> {
    /// Attach results to the unit of work
    pub tracking: bool,
    /// Eager-load paths, already resolved
    pub includes: Vec<ResolvedInclude>,
    /// Bypass the active-record filter
    pub with_deleted: bool,
    /// Caller predicate
    pub predicate: Option<Predicate<T>>,
    /// Ordering
    pub order: Option<OrderBy<T>>,
    /// Rows to skip after ordering
    pub skip: Option<usize>,
    /// Maximum rows to return
    pub take: Option<usize>,
}

impl<T> Clone for QueryPlan<T> {
    fn clone(&self) -> Self {
        Self {
            tracking: self.tracking,
            includes: self.includes.clone(),
            with_deleted: self.with_deleted,
            predicate: self.predicate.clone(),
            order: self.order.clone(),
            skip: self.skip,
            take: self.take,
        }
    }
}

impl<T> fmt::Debug for QueryPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPlan")
            .field("tracking", &self.tracking)
            .field(
                "includes",
                &self.includes.iter().map(|i| i.path.as_str()).collect::<Vec<_>>(),
            )
            .field("with_deleted", &self.with_deleted)
            .field("predicate", &self.predicate.is_some())
            .field("order", &self.order.is_some())
            .field("skip", &self.skip)
            .field("take", &self.take)
            .finish()
    }
}

impl<T> Default for QueryPlan<T> {
    fn default() -> Self {
        Self {
            tracking: true,
            includes: Vec::new(),
            with_deleted: false,
            predicate: None,
            order: None,
            skip: None,
            take: None,
        }
    }
}

impl<T: Entity> QueryPlan<T> {
    /// Set skip/take
    #[must_use]
    pub fn with_window(mut self, skip: usize, take: usize) -> Self {
        self.skip = Some(skip);
        self.take = Some(take);
        self
    }

    /// Same plan without skip/take, used for counts
    #[must_use]
    pub fn without_window(&self) -> Self {
        Self {
            skip: None,
            take: None,
            ..self.clone()
        }
    }

    /// Steps 3 and 4 for a single row
    pub fn admits(&self, row: &T) -> bool {
        (self.with_deleted || !row.is_deleted())
            && self.predicate.as_ref().map_or(true, |p| p.matches(row))
    }

    /// Apply steps 3 to 6 to rows in source order
    pub fn evaluate(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut matched: Vec<T> = rows.into_iter().filter(|row| self.admits(row)).collect();
        if let Some(order) = &self.order {
            order.sort(&mut matched);
        }
        let skip = self.skip.unwrap_or(0);
        let take = self.take.unwrap_or(usize::MAX);
        matched.into_iter().skip(skip).take(take).collect()
    }
}
