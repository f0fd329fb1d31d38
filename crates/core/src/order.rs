// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic acquisition order
//!
//! Jobs that contend for overlapping resource sets cannot deadlock as long as
//! every job acquires in the same global order. That order is the ascending
//! sort of canonical keys, computed once per job run.

use crate::key::{KeyError, ResourceKey};
use serde::Serialize;
use std::collections::BTreeSet;

/// A non-empty, deduplicated, ascending sequence of resource keys
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AcquisitionOrder {
    keys: Vec<ResourceKey>,
}

impl AcquisitionOrder {
    /// Normalize, deduplicate and sort the requested resource names.
    pub fn from_names<I, S>(names: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = BTreeSet::new();
        for (index, name) in names.into_iter().enumerate() {
            let key = ResourceKey::parse(name.as_ref()).map_err(|e| match e {
                KeyError::EmptyName { .. } => KeyError::EmptyName {
                    position: index + 1,
                },
                other => other,
            })?;
            keys.insert(key);
        }

        if keys.is_empty() {
            return Err(KeyError::Empty);
        }

        Ok(Self {
            keys: keys.into_iter().collect(),
        })
    }

    /// Parse a comma-separated resource list such as `"b, a,c"`.
    pub fn parse_list(list: &str) -> Result<Self, KeyError> {
        if list.trim().is_empty() {
            return Err(KeyError::Empty);
        }
        Self::from_names(list.split(','))
    }

    pub fn keys(&self) -> &[ResourceKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; an order holds at least one key.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceKey> {
        self.keys.iter()
    }

    /// Position of `key` in the order, if requested
    pub fn position(&self, key: &ResourceKey) -> Option<usize> {
        self.keys.binary_search(key).ok()
    }

    /// True if `held` matches the first `held.len()` keys of this order.
    pub fn has_prefix<'a, I>(&self, held: I) -> bool
    where
        I: IntoIterator<Item = &'a ResourceKey>,
    {
        let mut expected = self.keys.iter();
        held.into_iter().all(|key| expected.next() == Some(key))
    }
}

impl<'a> IntoIterator for &'a AcquisitionOrder {
    type Item = &'a ResourceKey;
    type IntoIter = std::slice::Iter<'a, ResourceKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl std::fmt::Display for AcquisitionOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.keys.iter().map(ResourceKey::as_str).collect();
        write!(f, "{}", joined.join(","))
    }
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
