// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! etcd-backed coordination
//!
//! A session is an etcd lease; a mutex is the v3 lock service bound to that
//! lease. Lease renewal is left to configuration: the TTL must cover the job.

use super::{CoordinationAdapter, CoordinationError, LockSession, MutexHandle};
use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, LockOptions};
use lockstep_core::{CoordinatorConfig, ResourceKey};
use std::time::Duration;

/// Connection to an etcd cluster
#[derive(Clone)]
pub struct EtcdAdapter {
    client: Client,
    endpoints: String,
    key_prefix: String,
    request_timeout: Duration,
}

impl EtcdAdapter {
    /// Dial the endpoints listed in `config`
    pub async fn connect(config: &CoordinatorConfig) -> Result<Self, CoordinationError> {
        let endpoints = config.endpoints.join(",");
        let options = ConnectOptions::new()
            .with_connect_timeout(config.dial_timeout)
            .with_timeout(config.lock_timeout.max(config.release_timeout));

        let connect = Client::connect(&config.endpoints, Some(options));
        let client = match tokio::time::timeout(config.dial_timeout, connect).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => {
                return Err(CoordinationError::Connect {
                    endpoints,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(CoordinationError::Connect {
                    endpoints,
                    message: format!("dial timed out after {:?}", config.dial_timeout),
                })
            }
        };

        Ok(Self {
            client,
            endpoints,
            key_prefix: config.key_prefix.clone(),
            request_timeout: config.request_timeout,
        })
    }
}

#[async_trait]
impl CoordinationAdapter for EtcdAdapter {
    type Session = EtcdSession;

    async fn open_session(&self, ttl: Duration) -> Result<Self::Session, CoordinationError> {
        let mut client = self.client.clone();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        // The channel connects lazily, so an unreachable cluster surfaces here
        let lease = match tokio::time::timeout(
            self.request_timeout,
            client.lease_grant(ttl_secs, None),
        )
        .await
        {
            Ok(Ok(lease)) => lease,
            Ok(Err(e)) => {
                return Err(CoordinationError::Connect {
                    endpoints: self.endpoints.clone(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(CoordinationError::Connect {
                    endpoints: self.endpoints.clone(),
                    message: format!("lease grant timed out after {:?}", self.request_timeout),
                })
            }
        };

        Ok(EtcdSession {
            id: format!("{:x}", lease.id()),
            lease_id: lease.id(),
            ttl,
            client,
            key_prefix: self.key_prefix.clone(),
            request_timeout: self.request_timeout,
        })
    }
}

/// An etcd lease scoping one job's locks
pub struct EtcdSession {
    id: String,
    lease_id: i64,
    ttl: Duration,
    client: Client,
    key_prefix: String,
    request_timeout: Duration,
}

#[async_trait]
impl LockSession for EtcdSession {
    type Mutex = EtcdMutex;

    fn id(&self) -> &str {
        &self.id
    }

    fn lease_ttl(&self) -> Duration {
        self.ttl
    }

    fn new_mutex(&self, key: &ResourceKey) -> Self::Mutex {
        EtcdMutex {
            key: key.clone(),
            name: format!("{}{}", self.key_prefix, key),
            lease_id: self.lease_id,
            client: self.client.clone(),
            owner_key: None,
        }
    }

    async fn close(mut self) -> Result<(), CoordinationError> {
        match tokio::time::timeout(self.request_timeout, self.client.lease_revoke(self.lease_id))
            .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(map_error(e)),
            Err(_) => Err(CoordinationError::Timeout(self.request_timeout)),
        }
    }
}

/// Lock on `<prefix><key>` owned by an etcd lease
pub struct EtcdMutex {
    key: ResourceKey,
    name: String,
    lease_id: i64,
    client: Client,
    /// Ownership key returned by the lock service, needed to unlock
    owner_key: Option<Vec<u8>>,
}

#[async_trait]
impl MutexHandle for EtcdMutex {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    async fn lock(&mut self, timeout: Duration) -> Result<(), CoordinationError> {
        let options = LockOptions::new().with_lease(self.lease_id);
        let request = self.client.lock(self.name.as_str(), Some(options));

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => {
                self.owner_key = Some(response.key().to_vec());
                Ok(())
            }
            Ok(Err(e)) => Err(map_error(e)),
            Err(_) => Err(CoordinationError::Timeout(timeout)),
        }
    }

    async fn unlock(&mut self, timeout: Duration) -> Result<(), CoordinationError> {
        let owner_key = self
            .owner_key
            .take()
            .ok_or_else(|| CoordinationError::NotHeld(self.key.to_string()))?;

        match tokio::time::timeout(timeout, self.client.unlock(owner_key)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(map_error(e)),
            Err(_) => Err(CoordinationError::Timeout(timeout)),
        }
    }
}

fn map_error(err: etcd_client::Error) -> CoordinationError {
    let message = err.to_string();
    if message.contains("lease not found") {
        CoordinationError::SessionExpired(message)
    } else {
        CoordinationError::Service(message)
    }
}
