// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration
//!
//! Loaded from an optional TOML file; command-line flags override it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default coordination endpoint
pub const DEFAULT_ENDPOINT: &str = "localhost:2379";

/// Default lease TTL for a lock session
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(120);

/// Default timeout for dialing the coordination service
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-lock timeout for acquire and release requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings shared by every job run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Coordination service endpoints
    pub endpoints: Vec<String>,
    /// Prefix prepended to every key sent to the service
    pub key_prefix: String,
    /// Lease TTL of the session that scopes a job's locks
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
    /// How long to wait for a connection to the service
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Duration,
    /// How long to wait for session requests (lease grant and revoke)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long to wait for each individual lock
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
    /// How long to wait for each individual release
    #[serde(with = "humantime_serde")]
    pub release_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            key_prefix: "/".to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            lock_timeout: DEFAULT_REQUEST_TIMEOUT,
            release_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    /// Read configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid("no endpoints configured".into()));
        }
        let timeouts = [
            ("session_ttl", self.session_ttl),
            ("dial_timeout", self.dial_timeout),
            ("request_timeout", self.request_timeout),
            ("lock_timeout", self.lock_timeout),
            ("release_timeout", self.release_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
            }
        }
        // etcd leases have whole-second granularity
        if self.session_ttl < Duration::from_secs(1) {
            return Err(ConfigError::Invalid(
                "session_ttl must be at least 1s".into(),
            ));
        }
        Ok(())
    }

    /// Worst-case time a job keeps its session busy: every lock waits its full
    /// timeout, then the workload runs for `hold`.
    pub fn worst_case_hold(&self, hold: Duration, lock_count: usize) -> Duration {
        let waits = self
            .lock_timeout
            .saturating_mul(u32::try_from(lock_count).unwrap_or(u32::MAX));
        waits.saturating_add(hold)
    }

    /// True if the session lease outlives the worst-case hold
    pub fn lease_covers(&self, hold: Duration, lock_count: usize) -> bool {
        self.session_ttl > self.worst_case_hold(hold, lock_count)
    }
}

/// Parse a duration flag: bare integers are seconds, anything else is
/// humantime (`90s`, `1m 30s`, `250ms`).
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| format!("invalid duration {:?}: {}", value, e))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
