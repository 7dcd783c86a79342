//! Entity keys and identities

use std::fmt;

use uuid::Uuid;

/// Value of an entity key
///
/// Key-less (naturally keyed) entities use [`KeyValue::Composite`] built from
/// the fields that make a row unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    /// Integer surrogate key
    Integer(i64),
    /// UUID key
    Uuid(Uuid),
    /// String key
    Text(String),
    /// Natural key made of several parts
    Composite(Vec<KeyValue>),
}

impl KeyValue {
    /// Build a composite natural key
    pub fn composite(parts: impl IntoIterator<Item = KeyValue>) -> Self {
        Self::Composite(parts.into_iter().collect())
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Uuid(id) => write!(f, "{id}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Composite(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for KeyValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for KeyValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for KeyValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<Uuid> for KeyValue {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Identity of a tracked entity: its type name plus its key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityIdentity {
    /// Registered entity type name
    pub entity_type: &'static str,
    /// Key within that type
    pub key: KeyValue,
}

impl EntityIdentity {
    /// Create an identity
    pub fn new(entity_type: &'static str, key: impl Into<KeyValue>) -> Self {
        Self {
            entity_type,
            key: key.into(),
        }
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.key)
    }
}
