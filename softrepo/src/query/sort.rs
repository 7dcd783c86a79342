//! Sort compiler
//!
//! Turns `(field, order)` requests into one combined, stable ordering. The
//! first request is the primary key; later requests only break ties.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::repository::{RepositoryError, RepositoryResult};

/// Sort direction
///
/// ```rust
/// use softrepo::query::SortOrder;
///
/// let order: SortOrder = serde_json::from_str("\"Desc\"").unwrap();
/// assert_eq!(order, SortOrder::Desc);
/// assert_eq!(order.to_string(), "desc");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest first
    #[default]
    #[serde(alias = "asc")]
    Asc,
    /// Largest first
    #[serde(alias = "desc")]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// One requested sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRequest {
    /// Field name, resolved against the entity's field registry
    pub field: String,
    /// Direction
    #[serde(default)]
    pub order: SortOrder,
}

impl SortRequest {
    /// Create a sort request
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// Ascending on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    /// Descending on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortOrder::Desc)
    }
}

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A compiled ordering over `T`
pub struct OrderBy<T> {
    compare: Comparator<T>,
}

impl<T> Clone for OrderBy<T> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T> fmt::Debug for OrderBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OrderBy(..)")
    }
}

impl<T: 'static> OrderBy<T> {
    /// Ordering from an arbitrary comparator
    pub fn by<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
        }
    }

    /// Break ties with `next`
    #[must_use]
    pub fn then(self, next: OrderBy<T>) -> Self {
        Self::by(move |a: &T, b: &T| self.compare(a, b).then_with(|| next.compare(a, b)))
    }

    /// Compare two rows
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.compare)(a, b)
    }

    /// Stable in-place sort
    pub fn sort(&self, rows: &mut [T]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}

impl<T: Entity> OrderBy<T> {
    /// Compile a list of requests
    ///
    /// Blank field names are dropped. Returns `Ok(None)` when nothing is left,
    /// meaning the source ordering is kept. Unknown names fail with
    /// `InvalidSortField`.
    pub fn compile(requests: &[SortRequest]) -> RepositoryResult<Option<Self>> {
        let registry = T::fields();
        let mut combined: Option<Self> = None;

        for request in requests {
            let field = request.field.trim();
            if field.is_empty() {
                continue;
            }
            let accessor = registry
                .get(field)
                .cloned()
                .ok_or_else(|| RepositoryError::invalid_sort_field(T::ENTITY_TYPE, field))?;
            let order = request.order;
            let key = Self::by(move |a: &T, b: &T| {
                let ordering = accessor(a).cmp(&accessor(b));
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
            combined = Some(match combined {
                Some(previous) => previous.then(key),
                None => key,
            });
        }

        if combined.is_none() {
            tracing::debug!(entity_type = T::ENTITY_TYPE, "No sort keys after dropping blanks");
        }
        Ok(combined)
    }

    /// Single-field form; equivalent to a one-element list
    pub fn single(field: &str, order: SortOrder) -> RepositoryResult<Option<Self>> {
        Self::compile(&[SortRequest::new(field, order)])
    }
}
