//! Pagination requests and page metadata
//!
//! Callers page either with a 0-based `{ index, size }` or a 1-based
//! `{ page, perPage }`. Both are reconciled once into a [`PageWindow`];
//! [`PageMeta::calculate`] is a pure function of the total count and the
//! window.
//!
//! # Example
//!
//! ```rust
//! use softrepo::repository::PageMeta;
//!
//! let meta = PageMeta::calculate(25, 3, 10).unwrap();
//! assert_eq!(meta.total_pages, 3);
//! assert_eq!(meta.previous_page, Some(2));
//! assert_eq!(meta.next_page, None);
//! assert!(meta.is_last_page);
//! ```

use serde::{Deserialize, Serialize};

use super::{RepositoryError, RepositoryResult};

/// Paging request as received from callers
///
/// ```rust
/// use softrepo::repository::PageRequest;
///
/// let zero_based: PageRequest = serde_json::from_str(r#"{"index":0,"size":5}"#).unwrap();
/// let one_based: PageRequest = serde_json::from_str(r#"{"page":1,"perPage":5}"#).unwrap();
/// assert_eq!(zero_based.resolve(100).unwrap(), one_based.resolve(100).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRequest {
    /// 0-based page index
    Index {
        /// Page index, first page is 0
        index: i64,
        /// Page size
        size: i64,
    },
    /// 1-based page number
    Page {
        /// Page number, first page is 1
        page: i64,
        /// Page size
        #[serde(rename = "perPage", alias = "per_page")]
        per_page: i64,
    },
}

impl PageRequest {
    /// 0-based request
    pub const fn index(index: i64, size: i64) -> Self {
        Self::Index { index, size }
    }

    /// 1-based request
    pub const fn page(page: i64, per_page: i64) -> Self {
        Self::Page { page, per_page }
    }

    /// Reconcile into a 1-based window
    ///
    /// A non-positive size is rejected. Sizes above `max_page_size` are
    /// clamped; a non-positive maximum disables clamping.
    pub fn resolve(self, max_page_size: i64) -> RepositoryResult<PageWindow> {
        let (page, requested) = match self {
            Self::Index { index, size } => (index.saturating_add(1), size),
            Self::Page { page, per_page } => (page, per_page),
        };

        if requested <= 0 {
            return Err(RepositoryError::invalid_pagination(format!(
                "Page size must be positive, got {requested}"
            )));
        }

        let per_page = if max_page_size > 0 && requested > max_page_size {
            tracing::warn!(
                requested,
                max_page_size,
                "Page size above maximum, clamping"
            );
            max_page_size
        } else {
            requested
        };

        Ok(PageWindow { page, per_page })
    }
}

/// A reconciled, 1-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Page number; may be below 1 or past the end
    pub page: i64,
    /// Page size, always positive
    pub per_page: i64,
}

impl PageWindow {
    /// Rows to skip, or `None` when the page lies before the first one
    pub fn skip(&self) -> Option<usize> {
        if self.page < 1 {
            return None;
        }
        let skip = (self.page - 1).checked_mul(self.per_page)?;
        usize::try_from(skip).ok()
    }

    /// Rows to take
    pub fn take(&self) -> usize {
        usize::try_from(self.per_page).unwrap_or(usize::MAX)
    }
}

/// Navigation metadata of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Requested page, 1-based
    pub current_page: i64,
    /// Previous page, when it exists
    pub previous_page: Option<i64>,
    /// Next page, when it exists
    pub next_page: Option<i64>,
    /// Page size
    pub per_page: i64,
    /// Number of pages
    pub total_pages: i64,
    /// Number of matching rows
    pub total_count: u64,
    /// Whether this is the first page
    pub is_first_page: bool,
    /// Whether this is the last page
    pub is_last_page: bool,
}

impl PageMeta {
    /// Derive metadata from the total count and a 1-based window
    pub fn calculate(total_count: u64, page: i64, per_page: i64) -> RepositoryResult<Self> {
        if per_page <= 0 {
            return Err(RepositoryError::invalid_pagination(format!(
                "Page size must be positive, got {per_page}"
            )));
        }

        let pages = total_count.div_ceil(per_page.unsigned_abs());
        let total_pages = i64::try_from(pages).unwrap_or(i64::MAX);

        let previous = page.saturating_sub(1);
        let next = page.saturating_add(1);

        Ok(Self {
            current_page: page,
            previous_page: (1..=total_pages).contains(&previous).then_some(previous),
            next_page: (1..=total_pages).contains(&next).then_some(next),
            per_page,
            total_pages,
            total_count,
            is_first_page: page <= 1,
            is_last_page: total_pages == 0 || page >= total_pages,
        })
    }
}

/// One page of results plus its metadata
///
/// Built once per query execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageableResponse<T> {
    /// Rows of this page
    pub data: Vec<T>,
    /// Page metadata
    pub meta: PageMeta,
}

impl<T> PageableResponse<T> {
    /// Create a response
    pub fn new(data: Vec<T>, meta: PageMeta) -> Self {
        Self { data, meta }
    }

    /// Map rows into another shape, keeping the metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageableResponse<U> {
        PageableResponse {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;

    #[test]
    fn test_total_pages_is_ceiling() {
        for (total, per_page, expected) in [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2), (25, 10, 3)] {
            let meta = PageMeta::calculate(total, 1, per_page).unwrap();
            assert_eq!(meta.total_pages, expected, "total={total} per_page={per_page}");
        }
    }

    #[test]
    fn test_last_page_of_three() {
        let meta = PageMeta::calculate(25, 3, 10).unwrap();
        assert_eq!(meta.previous_page, Some(2));
        assert_eq!(meta.next_page, None);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.is_last_page);
        assert!(!meta.is_first_page);
    }

    #[test]
    fn test_empty_result_is_first_and_last() {
        let meta = PageMeta::calculate(0, 1, 10).unwrap();
        assert_eq!(meta.total_pages, 0);
        assert_eq!(meta.previous_page, None);
        assert_eq!(meta.next_page, None);
        assert!(meta.is_first_page);
        assert!(meta.is_last_page);
    }

    #[test]
    fn test_page_past_end() {
        let meta = PageMeta::calculate(25, 7, 10).unwrap();
        assert_eq!(meta.previous_page, None);
        assert_eq!(meta.next_page, None);
        assert!(meta.is_last_page);
    }

    #[test]
    fn test_page_below_first() {
        let meta = PageMeta::calculate(25, 0, 10).unwrap();
        assert_eq!(meta.previous_page, None);
        assert_eq!(meta.next_page, Some(1));
        assert!(meta.is_first_page);
        assert!(!meta.is_last_page);
    }

    #[test]
    fn test_last_page_property_holds() {
        for total in 0..40_u64 {
            for per_page in 1..8_i64 {
                for page in -1..10_i64 {
                    let meta = PageMeta::calculate(total, page, per_page).unwrap();
                    let expected_pages = total.div_ceil(per_page as u64) as i64;
                    assert_eq!(meta.total_pages, expected_pages);
                    assert_eq!(
                        meta.is_last_page,
                        page >= expected_pages || expected_pages == 0
                    );
                }
            }
        }
    }

    #[test]
    fn test_non_positive_size_rejected() {
        let err = PageMeta::calculate(5, 1, 0).unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidPagination);
        assert!(PageRequest::index(0, -3).resolve(100).is_err());
    }

    #[test]
    fn test_index_converts_once() {
        let window = PageRequest::index(2, 5).resolve(100).unwrap();
        assert_eq!(window, PageWindow { page: 3, per_page: 5 });
        assert_eq!(window.skip(), Some(10));
        assert_eq!(window.take(), 5);
    }

    #[test]
    fn test_oversized_page_is_clamped() {
        let window = PageRequest::page(1, 5_000).resolve(100).unwrap();
        assert_eq!(window.per_page, 100);
        let unclamped = PageRequest::page(1, 5_000).resolve(0).unwrap();
        assert_eq!(unclamped.per_page, 5_000);
    }

    #[test]
    fn test_below_first_has_no_skip() {
        assert_eq!(PageRequest::index(-1, 5).resolve(100).unwrap().skip(), None);
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let response = PageableResponse::new(vec![1, 2], PageMeta::calculate(2, 1, 5).unwrap());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["meta"]["currentPage"], 1);
        assert_eq!(json["meta"]["totalCount"], 2);
        assert!(json["meta"]["previousPage"].is_null());
        assert!(json["meta"]["nextPage"].is_null());
        assert_eq!(json["meta"]["isLastPage"], true);
    }

    #[test]
    fn test_page_request_accepts_per_page_spellings() {
        let camel: PageRequest = serde_json::from_str(r#"{"page":1,"perPage":5}"#).unwrap();
        let snake: PageRequest = serde_json::from_str(r#"{"page":1,"per_page":5}"#).unwrap();
        assert_eq!(camel, PageRequest::page(1, 5));
        assert_eq!(snake, camel);

        let json = serde_json::to_value(PageRequest::page(2, 10)).unwrap();
        assert_eq!(json["perPage"], 10);
        assert!(json.get("per_page").is_none());

        let zero_based: PageRequest = serde_json::from_str(r#"{"index":0,"size":5}"#).unwrap();
        assert_eq!(zero_based.resolve(100).unwrap(), camel.resolve(100).unwrap());
    }
}
