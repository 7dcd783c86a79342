//! Type-safe identifiers using the TypeID specification
//!
//! Concurrency stamps are TypeIDs with the `cst` prefix and a UUIDv7 suffix.
//! They are opaque to callers: the only meaningful operation is equality, and
//! a fresh stamp is generated on every persisted change.
//!
//! ```rust
//! use softrepo::ids::ConcurrencyStamp;
//!
//! let stamp = ConcurrencyStamp::new();
//! assert!(stamp.as_str().starts_with("cst_"));
//! ```

use mti::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque optimistic-concurrency token
///
/// # Format
///
/// `cst_<base32-encoded-uuidv7>`, e.g. `cst_01h455vb4pex5vsknk084sn02q`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConcurrencyStamp(MagicTypeId);

impl ConcurrencyStamp {
    /// The prefix used for concurrency stamps
    pub const PREFIX: &'static str = "cst";

    /// Creates a fresh stamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Returns the stamp as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the prefix portion of the stamp.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl Default for ConcurrencyStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConcurrencyStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConcurrencyStamp {
    type Err = ConcurrencyStampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mti = MagicTypeId::from_str(s).map_err(ConcurrencyStampError::Parse)?;

        if mti.prefix().as_str() != Self::PREFIX {
            return Err(ConcurrencyStampError::InvalidPrefix {
                expected: Self::PREFIX.to_string(),
                actual: mti.prefix().as_str().to_string(),
            });
        }

        Ok(Self(mti))
    }
}

impl AsRef<str> for ConcurrencyStamp {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for ConcurrencyStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConcurrencyStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Error type for concurrency stamp parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConcurrencyStampError {
    /// The stamp could not be parsed as a valid TypeID.
    #[error("failed to parse concurrency stamp: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// The prefix was not the expected value.
    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        /// The expected prefix.
        expected: String,
        /// The actual prefix found.
        actual: String,
    },
}
