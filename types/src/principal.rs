//! Principal identifiers.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated actor identifier.
///
/// Opaque to the engine: whatever the identity provider hands out (a wallet
/// identity, a CA enrollment name) is carried through unchanged.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Longest principal id accepted, in bytes.
    pub const MAX_LEN: usize = 128;

    /// Create a principal id, rejecting empty or oversized strings.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let s = raw.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPrincipal);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(ValidationError::PrincipalTooLong {
                len: trimmed.len(),
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PrincipalId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for PrincipalId {
    type Error = ValidationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PrincipalId> for String {
    fn from(p: PrincipalId) -> Self {
        p.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let p = PrincipalId::new("  user1 ").unwrap();
        assert_eq!(p.as_str(), "user1");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert_eq!(PrincipalId::new(""), Err(ValidationError::EmptyPrincipal));
        assert_eq!(PrincipalId::new("   "), Err(ValidationError::EmptyPrincipal));
    }

    #[test]
    fn rejects_oversized() {
        let long = "x".repeat(PrincipalId::MAX_LEN + 1);
        assert!(matches!(
            PrincipalId::new(long),
            Err(ValidationError::PrincipalTooLong { .. })
        ));
    }

    #[test]
    fn deserialize_validates() {
        let ok: PrincipalId = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(ok.as_str(), "admin");
        assert!(serde_json::from_str::<PrincipalId>("\"\"").is_err());
    }
}
