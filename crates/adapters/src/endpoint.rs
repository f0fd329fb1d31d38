// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint selection
//!
//! `file:///dir` selects the lease table backend; anything else is an etcd
//! address.

use std::path::PathBuf;
use thiserror::Error;

const FILE_SCHEME: &str = "file://";

/// Errors interpreting the endpoint list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("no endpoints specified")]
    Empty,
    #[error("file:// endpoint has no path")]
    EmptyPath,
    #[error("only one file:// endpoint may be given")]
    MultipleLeaseTables,
    #[error("cannot mix file:// and etcd endpoints")]
    MixedSchemes,
}

/// A resolved coordination backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Lease table in a shared directory
    LeaseTable(PathBuf),
    /// etcd cluster addresses
    Etcd(Vec<String>),
}

impl Endpoint {
    pub fn parse<S: AsRef<str>>(endpoints: &[S]) -> Result<Self, EndpointError> {
        let endpoints: Vec<&str> = endpoints
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| !e.is_empty())
            .collect();

        if endpoints.is_empty() {
            return Err(EndpointError::Empty);
        }

        let files = endpoints
            .iter()
            .filter(|e| e.starts_with(FILE_SCHEME))
            .count();

        match files {
            0 => Ok(Endpoint::Etcd(
                endpoints.into_iter().map(str::to_string).collect(),
            )),
            1 if endpoints.len() == 1 => {
                let path = &endpoints[0][FILE_SCHEME.len()..];
                if path.is_empty() {
                    return Err(EndpointError::EmptyPath);
                }
                Ok(Endpoint::LeaseTable(PathBuf::from(path)))
            }
            n if n == endpoints.len() => Err(EndpointError::MultipleLeaseTables),
            _ => Err(EndpointError::MixedSchemes),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::LeaseTable(dir) => write!(f, "{}{}", FILE_SCHEME, dir.display()),
            Endpoint::Etcd(addrs) => write!(f, "{}", addrs.join(",")),
        }
    }
}
