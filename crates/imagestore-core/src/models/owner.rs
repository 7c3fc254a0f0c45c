use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_OWNER_ID_LEN;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid owner id: {reason}")]
pub struct InvalidOwnerId {
    pub reason: &'static str,
}

/// Opaque user identifier that partitions every record and every artifact path.
///
/// Owner tokens become a directory name below the storage root, so construction only
/// accepts ASCII alphanumerics and `-`, `_`, `.`, `@`, and never `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidOwnerId> {
        let value = value.into();
        if value.is_empty() {
            return Err(InvalidOwnerId {
                reason: "must not be empty",
            });
        }
        if value.len() > MAX_OWNER_ID_LEN {
            return Err(InvalidOwnerId {
                reason: "too long",
            });
        }
        if value == "." || value == ".." {
            return Err(InvalidOwnerId {
                reason: "reserved name",
            });
        }
        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@');
        if !value.chars().all(allowed) {
            return Err(InvalidOwnerId {
                reason: "contains unsupported characters",
            });
        }
        Ok(OwnerId(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OwnerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OwnerId {
    type Err = InvalidOwnerId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OwnerId::parse(s)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = InvalidOwnerId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OwnerId::parse(value)
    }
}

impl From<OwnerId> for String {
    fn from(owner: OwnerId) -> Self {
        owner.0
    }
}
