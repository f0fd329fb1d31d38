// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical resource keys
//!
//! Every caller must derive the same key for the same resource, otherwise the
//! global acquisition order breaks down across jobs.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while normalizing requested resource names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("no resources specified")]
    Empty,
    #[error("resource name at position {position} is empty")]
    EmptyName { position: usize },
    #[error("resource name {name:?} contains whitespace or control characters")]
    InvalidCharacter { name: String },
}

/// An immutable, normalized identifier for one lockable resource
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Normalize a raw resource name into its canonical key.
    ///
    /// Surrounding whitespace and slashes are stripped and ASCII letters are
    /// lowercased, so `" DB/Users/ "` and `"db/users"` name the same lock.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(KeyError::EmptyName { position: 0 });
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(KeyError::InvalidCharacter {
                name: raw.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.0
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
