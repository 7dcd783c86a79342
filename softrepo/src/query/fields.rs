//! Typed field registry
//!
//! Sorting and named filters address entity fields by name. Each entity type
//! builds one [`FieldRegistry`] (usually in a `once_cell` static) mapping
//! names to accessors, so names are resolved once and evaluation never goes
//! through reflection.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Value read from an entity field
///
/// Values are totally ordered: first by variant (`Null` sorts first), then by
/// value. Floats use IEEE total ordering.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Missing value
    Null,
    /// Boolean
    Boolean(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
    /// UUID
    Uuid(Uuid),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Uuid(_) => 5,
            Self::Timestamp(_) => 6,
        }
    }

    /// Whether this is [`FieldValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Uuid(a), Self::Uuid(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Uuid> for FieldValue {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl<V: Into<FieldValue>> From<Option<V>> for FieldValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Accessor reading one field of `T`
pub type FieldAccessor<T> = Arc<dyn Fn(&T) -> FieldValue + Send + Sync>;

/// Named field accessors for one entity type
pub struct FieldRegistry<T> {
    fields: Vec<(&'static str, FieldAccessor<T>)>,
}

impl<T> FieldRegistry<T> {
    /// Start an empty registry
    pub fn builder() -> FieldRegistryBuilder<T> {
        FieldRegistryBuilder { fields: Vec::new() }
    }

    /// Accessor for `name`; names are case-sensitive
    pub fn get(&self, name: &str) -> Option<&FieldAccessor<T>> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, accessor)| accessor)
    }

    /// Read `name` from `entity`
    pub fn value(&self, entity: &T, name: &str) -> Option<FieldValue> {
        self.get(name).map(|accessor| accessor(entity))
    }

    /// Registered names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }
}

impl<T> fmt::Debug for FieldRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("fields", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`FieldRegistry`]
pub struct FieldRegistryBuilder<T> {
    fields: Vec<(&'static str, FieldAccessor<T>)>,
}

impl<T> FieldRegistryBuilder<T> {
    /// Register a field; a later registration of the same name replaces it
    #[must_use]
    pub fn field<F>(mut self, name: &'static str, accessor: F) -> Self
    where
        F: Fn(&T) -> FieldValue + Send + Sync + 'static,
    {
        self.fields.retain(|(existing, _)| *existing != name);
        self.fields.push((name, Arc::new(accessor)));
        self
    }

    /// Finish the registry
    pub fn build(self) -> FieldRegistry<T> {
        FieldRegistry {
            fields: self.fields,
        }
    }
}
