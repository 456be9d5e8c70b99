//! # Asset Names
//!
//! `AssetName` is the only filename type a storage backend or the catalog
//! accepts. Construction applies the traversal guard, so a value of this
//! type can be joined onto a storage root or used as an object key as-is.

use serde::{Deserialize, Serialize};

use crate::digest;
use crate::error::NameError;

/// Longest accepted filename, in bytes. Matches common filesystem limits.
pub const MAX_NAME_LEN: usize = 255;

/// A validated asset filename, e.g. `"<sha256 hex>.png"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetName(String);

impl AssetName {
    /// Validate a raw filename taken from a request path.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        if raw.is_empty() {
            return Err(NameError::Empty);
        }
        if raw.contains('/') || raw.contains('\\') {
            return Err(NameError::PathSeparator(raw.to_string()));
        }
        if raw.starts_with('.') {
            return Err(NameError::LeadingDot(raw.to_string()));
        }
        if raw.chars().any(char::is_control) {
            return Err(NameError::ControlCharacter);
        }
        if raw.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(raw.len()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The claimed digest: everything before the first `.`.
    pub fn base_name(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// The extension after the first `.`, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, ext)| ext)
    }

    /// Whether `digest_hex` is the content address this name claims.
    pub fn matches_digest(&self, digest_hex: &str) -> bool {
        digest::verify(&self.0, digest_hex)
    }
}

impl std::fmt::Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssetName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetName> for String {
    fn from(name: AssetName) -> Self {
        name.0
    }
}
