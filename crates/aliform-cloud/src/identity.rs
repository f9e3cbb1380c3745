//! Resource identity codec
//!
//! A managed object is addressed by a single opaque string. Composite
//! identities join the parent keys with [`DELIMITER`] in a fixed order, e.g.
//! `service:function:trigger`. The format is persisted, so changing the
//! delimiter or the part order of a resource kind is a breaking migration.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

/// Separator between the parts of a composite identity
pub const DELIMITER: char = ':';

/// Stable identity of a managed object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Simple identity used as-is
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Join parts in caller-supplied order
    ///
    /// No escaping is performed, so a part containing [`DELIMITER`] is
    /// rejected with [`CloudError::InvalidIdentity`].
    pub fn encode<I, S>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = parts.into_iter().map(|p| p.as_ref().to_string()).collect();
        let joined = parts.join(&DELIMITER.to_string());
        if parts.iter().any(|p| p.contains(DELIMITER)) {
            return Err(CloudError::InvalidIdentity {
                actual: joined.split(DELIMITER).count(),
                id: joined,
                expected: parts.len(),
            });
        }
        Ok(Self(joined))
    }

    /// Split into exactly `expected` parts
    ///
    /// Empty parts are legal as long as the count matches.
    pub fn decode(&self, expected: usize) -> Result<Vec<String>> {
        decode(&self.0, expected)
    }

    /// Split into a fixed-size array of parts
    pub fn parts<const N: usize>(&self) -> Result<[String; N]> {
        let parts = self.decode(N)?;
        parts.try_into().map_err(|parts: Vec<String>| CloudError::InvalidIdentity {
            id: self.0.clone(),
            expected: N,
            actual: parts.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Join parts with the delimiter
pub fn encode(parts: &[&str]) -> Result<String> {
    Identity::encode(parts).map(Identity::into_string)
}

/// Split `id` and require exactly `expected` parts
pub fn decode(id: &str, expected: usize) -> Result<Vec<String>> {
    let parts: Vec<String> = id.split(DELIMITER).map(str::to_string).collect();
    if parts.len() != expected {
        return Err(CloudError::InvalidIdentity {
            id: id.to_string(),
            expected,
            actual: parts.len(),
        });
    }
    Ok(parts)
}
