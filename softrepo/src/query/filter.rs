//! Predicates and named filter conditions
//!
//! A [`Predicate`] is the caller-supplied filter of a query. It is usually a
//! closure over the typed entity, but can also be compiled from named
//! [`FilterCondition`]s, which resolve their field names against the entity's
//! [`FieldRegistry`](super::FieldRegistry).
//!
//! # Example
//!
//! ```rust
//! use softrepo::query::FilterCondition;
//!
//! let filters = vec![
//!     FilterCondition::eq("status", "active"),
//!     FilterCondition::gte("total", 18_i64),
//!     FilterCondition::like("email", "%@example.com"),
//! ];
//! assert_eq!(filters.len(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

use super::fields::{FieldAccessor, FieldValue};
use crate::entity::Entity;
use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

/// Comparison operators for filter conditions
///
/// ```rust
/// use softrepo::query::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::Equal), "=");
/// assert_eq!(format!("{}", FilterOperator::Like), "LIKE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching (LIKE)
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A value that can be used in filter conditions
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for IN operator)
    StringList(Vec<String>),
    /// List of integer values (for IN operator)
    IntegerList(Vec<i64>),
    /// Null value (for IS NULL / IS NOT NULL)
    Null,
}

impl FilterValue {
    fn scalar(&self) -> Option<FieldValue> {
        match self {
            Self::String(s) => Some(FieldValue::Text(s.clone())),
            Self::Integer(n) => Some(FieldValue::Integer(*n)),
            Self::Float(n) => Some(FieldValue::Float(*n)),
            Self::Boolean(b) => Some(FieldValue::Boolean(*b)),
            Self::StringList(_) | Self::IntegerList(_) | Self::Null => None,
        }
    }

    fn list(&self) -> Option<Vec<FieldValue>> {
        match self {
            Self::StringList(items) => Some(items.iter().cloned().map(FieldValue::Text).collect()),
            Self::IntegerList(items) => Some(items.iter().copied().map(FieldValue::Integer).collect()),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

/// A single named filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Create a not-equal filter (field != value)
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Create a greater-than filter (field > value)
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Create a greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Create a less-than filter (field < value)
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Create a less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Create a LIKE pattern filter (`%` any run, `_` one character)
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    /// Create an IN list filter for strings
    pub fn in_strings(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::StringList(values))
    }

    /// Create an IN list filter for integers
    pub fn in_integers(field: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }

    /// Create an IS NULL filter
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// Create an IS NOT NULL filter
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }

    fn invalid(&self, reason: &str) -> RepositoryError {
        RepositoryError::validation_failed(
            RepositoryOperation::BuildQuery,
            format!(
                "Filter '{} {} {:?}' {reason}",
                self.field, self.operator, self.value
            ),
        )
    }

    /// Compile against `T`'s field registry
    fn compile<T: Entity>(&self) -> RepositoryResult<Predicate<T>> {
        let accessor: FieldAccessor<T> = T::fields().get(&self.field).cloned().ok_or_else(|| {
            RepositoryError::validation_failed(
                RepositoryOperation::BuildQuery,
                format!("Unknown filter field '{}' on {}", self.field, T::ENTITY_TYPE),
            )
        })?;

        let predicate = match self.operator {
            FilterOperator::IsNull => Predicate::new(move |e: &T| accessor(e).is_null()),
            FilterOperator::IsNotNull => Predicate::new(move |e: &T| !accessor(e).is_null()),
            FilterOperator::In => {
                let items = self
                    .value
                    .list()
                    .ok_or_else(|| self.invalid("needs a list value"))?;
                Predicate::new(move |e: &T| items.contains(&accessor(e)))
            }
            FilterOperator::Like => {
                let pattern = match &self.value {
                    FilterValue::String(p) => p.clone(),
                    _ => return Err(self.invalid("needs a string pattern")),
                };
                Predicate::new(move |e: &T| {
                    accessor(e)
                        .as_text()
                        .is_some_and(|text| like_matches(&pattern, text))
                })
            }
            op => {
                let expected = self
                    .value
                    .scalar()
                    .ok_or_else(|| self.invalid("needs a scalar value"))?;
                Predicate::new(move |e: &T| {
                    let actual = accessor(e);
                    // SQL semantics: comparisons against null never match
                    if actual.is_null() {
                        return false;
                    }
                    let ordering = actual.cmp(&expected);
                    match op {
                        FilterOperator::Equal => ordering.is_eq(),
                        FilterOperator::NotEqual => ordering.is_ne(),
                        FilterOperator::GreaterThan => ordering.is_gt(),
                        FilterOperator::GreaterThanOrEqual => ordering.is_ge(),
                        FilterOperator::LessThan => ordering.is_lt(),
                        FilterOperator::LessThanOrEqual => ordering.is_le(),
                        _ => false,
                    }
                })
            }
        };
        Ok(predicate)
    }
}

/// SQL `LIKE` matching: `%` matches any run, `_` exactly one character
pub(crate) fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// Caller predicate over a typed entity
pub struct Predicate<T> {
    test: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

impl<T: 'static> Predicate<T> {
    /// Wrap a closure
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Arc::new(test),
        }
    }

    /// Evaluate against one row
    pub fn matches(&self, entity: &T) -> bool {
        (self.test)(entity)
    }

    /// Both predicates must hold
    #[must_use]
    pub fn and(self, other: Predicate<T>) -> Self {
        Self::new(move |e: &T| self.matches(e) && other.matches(e))
    }
}

impl<T: Entity> Predicate<T> {
    /// Compile named conditions into one conjunction
    ///
    /// An empty slice matches every row. Unknown fields and operator/value
    /// mismatches fail here, before the query runs.
    pub fn from_conditions(conditions: &[FilterCondition]) -> RepositoryResult<Self> {
        let compiled = conditions
            .iter()
            .map(FilterCondition::compile::<T>)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(Self::new(move |e: &T| compiled.iter().all(|p| p.matches(e))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;
    use crate::testing::{self, Order};

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::NotEqual), "!=");
        assert_eq!(format!("{}", FilterOperator::In), "IN");
        assert_eq!(format!("{}", FilterOperator::IsNotNull), "IS NOT NULL");
    }

    #[test]
    fn test_like_matching() {
        assert!(like_matches("%@example.com", "ann@example.com"));
        assert!(like_matches("a_c", "abc"));
        assert!(like_matches("%", ""));
        assert!(like_matches("a%b%c", "aXXbYYc"));
        assert!(!like_matches("a_c", "abbc"));
        assert!(!like_matches("abc", "ABC"));
    }

    #[test]
    fn test_conditions_compile_to_conjunction() {
        let predicate = Predicate::<Order>::from_conditions(&[
            FilterCondition::eq("status", "open"),
            FilterCondition::gte("total", 50_i64),
        ])
        .unwrap();

        let mut cheap = testing::order(1, 10, "open");
        cheap.total = 20;
        let mut big = testing::order(2, 10, "open");
        big.total = 80;
        let mut closed = testing::order(3, 10, "closed");
        closed.total = 80;

        assert!(!predicate.matches(&cheap));
        assert!(predicate.matches(&big));
        assert!(!predicate.matches(&closed));
    }

    #[test]
    fn test_in_and_null_conditions() {
        let in_status = Predicate::<Order>::from_conditions(&[FilterCondition::in_strings(
            "status",
            vec!["open".to_string(), "held".to_string()],
        )])
        .unwrap();
        assert!(in_status.matches(&testing::order(1, 10, "held")));
        assert!(!in_status.matches(&testing::order(2, 10, "closed")));

        let no_note = Predicate::<Order>::from_conditions(&[FilterCondition::is_null("note")]).unwrap();
        assert!(no_note.matches(&testing::order(1, 10, "open")));
    }

    #[test]
    fn test_null_never_compares_equal() {
        let predicate =
            Predicate::<Order>::from_conditions(&[FilterCondition::ne("note", "x")]).unwrap();
        assert!(!predicate.matches(&testing::order(1, 10, "open")));
    }

    #[test]
    fn test_unknown_field_fails_at_build() {
        let err = Predicate::<Order>::from_conditions(&[FilterCondition::eq("colour", "red")])
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert_eq!(err.operation, RepositoryOperation::BuildQuery);
    }

    #[test]
    fn test_operator_value_mismatch_fails_at_build() {
        let err = Predicate::<Order>::from_conditions(&[FilterCondition::new(
            "status",
            FilterOperator::In,
            FilterValue::from("open"),
        )])
        .unwrap_err();
        assert!(err.message.contains("list"));
    }

    #[test]
    fn test_and_combines() {
        let open = Predicate::new(|o: &Order| o.status == "open");
        let first = Predicate::new(|o: &Order| o.id == 1);
        let both = open.and(first);
        assert!(both.matches(&testing::order(1, 10, "open")));
        assert!(!both.matches(&testing::order(2, 10, "open")));
    }
}
