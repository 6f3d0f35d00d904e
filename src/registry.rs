// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The record store the reconciler reads from and writes to.
//!
//! [`Registry`] is the only I/O boundary the reconciliation core depends
//! on; [`EtcdRegistry`] is the production implementation, backed by an
//! etcd v3 cluster shared across every host running this daemon. The key
//! and value layout is bit-exact with the DNS server already consuming it
//! (`{etcd_path_prefix}/{reversed-dotted-labels}/x{N}`, JSON value).

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use etcd_client::{Client, Compare, CompareOp, GetOptions, Txn, TxnOp};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::RegistryError;
use crate::intent::RecordIntent;
use crate::record::{Record, RecordType};

/// The record store abstraction the reconciler depends on.
///
/// Implementations never interpret record semantics (coexistence,
/// duplicates, cycles) — that belongs to [`crate::validator`]. A
/// `Registry` only persists and returns what it is given.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Lists every record currently persisted, across all hosts.
    async fn list(&self) -> Result<Vec<RecordIntent>, RegistryError>;

    /// Persists `intent` under a fresh indexed key for its name.
    async fn register(&self, intent: &RecordIntent) -> Result<(), RegistryError>;

    /// Removes the persisted entry matching `intent`'s record and
    /// provenance. A no-op if no matching entry exists.
    async fn remove(&self, intent: &RecordIntent) -> Result<(), RegistryError>;

    /// Acquires a cross-host mutual-exclusion lock scoped to `keys`,
    /// returning a guard that releases every held lease when dropped.
    /// Keys are sorted before acquisition to avoid cyclic wait across
    /// concurrently racing hosts.
    async fn lock_transaction(&self, keys: &[String]) -> Result<LockGuard, RegistryError>;
}

/// Wire value shape persisted at each indexed record key, matching the
/// layout the DNS server already reads.
#[derive(Debug, Serialize, Deserialize)]
struct EtcdValue {
    host: String,
    record_type: String,
    owner_hostname: String,
    owner_container_name: String,
    created: DateTime<Utc>,
    /// Additive field: not read by the DNS server, but round-tripped so a
    /// `force`-originated intent survives a `list()` unchanged.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    force: bool,
}

/// An etcd v3-backed [`Registry`].
pub struct EtcdRegistry {
    client: Client,
    path_prefix: String,
    hostname: String,
    lock_ttl: Duration,
    lock_timeout: Duration,
    lock_retry_interval: Duration,
}

impl EtcdRegistry {
    /// Connects to the configured etcd endpoint.
    pub async fn connect(config: &Config) -> Result<Self, RegistryError> {
        let endpoint = format!("{}:{}", config.etcd_host, config.etcd_port);
        let client = Client::connect([endpoint.as_str()], None)
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;
        Ok(EtcdRegistry {
            client,
            path_prefix: config.etcd_path_prefix.clone(),
            hostname: config.hostname.clone(),
            lock_ttl: config.etcd_lock_ttl,
            lock_timeout: config.etcd_lock_timeout,
            lock_retry_interval: config.etcd_lock_retry_interval,
        })
    }

    fn base_key(&self, fqdn: &str) -> String {
        base_key(&self.path_prefix, fqdn)
    }

    fn key_to_fqdn(&self, key: &str) -> String {
        key_to_fqdn(&self.path_prefix, key)
    }

    async fn next_indexed_key(&self, client: &mut Client, fqdn: &str) -> Result<String, RegistryError> {
        let base = self.base_key(fqdn);
        let resp = client
            .get(base.as_str(), Some(GetOptions::new().with_prefix()))
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        let mut used: HashSet<u32> = HashSet::new();
        for kv in resp.kvs() {
            let key = String::from_utf8_lossy(kv.key());
            if let Some(suffix) = key.rsplit('/').next() {
                if let Some(n) = suffix.strip_prefix('x').and_then(|s| s.parse::<u32>().ok()) {
                    used.insert(n);
                }
            }
        }
        let mut index = 1u32;
        while used.contains(&index) {
            index += 1;
        }
        Ok(format!("{base}/x{index}"))
    }

    fn to_wire_value(intent: &RecordIntent) -> EtcdValue {
        EtcdValue {
            host: intent.record.value(),
            record_type: intent.record.record_type().as_str().to_string(),
            owner_hostname: intent.hostname.clone(),
            owner_container_name: intent.container_name.clone(),
            created: intent.created,
            force: intent.force,
        }
    }

    fn from_wire(&self, key: &str, raw: &[u8]) -> Result<RecordIntent, RegistryError> {
        let value: EtcdValue = serde_json::from_slice(raw).map_err(|e| RegistryError::Parse {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let name = self.key_to_fqdn(key);
        let record_type: RecordType = value.record_type.parse().map_err(|_| RegistryError::Parse {
            key: key.to_string(),
            reason: format!("unsupported record type: {}", value.record_type),
        })?;
        let record = match record_type {
            RecordType::A => Record::new_a(&name, &value.host),
            RecordType::Cname => Record::new_cname(&name, &value.host),
        }
        .map_err(|e| RegistryError::Parse {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        Ok(RecordIntent {
            record,
            hostname: value.owner_hostname,
            container_id: String::new(),
            container_name: value.owner_container_name,
            created: value.created,
            force: value.force,
        })
    }
}

#[async_trait]
impl Registry for EtcdRegistry {
    async fn list(&self) -> Result<Vec<RecordIntent>, RegistryError> {
        let mut client = self.client.clone();
        let resp = client
            .get(
                self.path_prefix.as_str(),
                Some(GetOptions::new().with_prefix()),
            )
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        let mut intents = Vec::with_capacity(resp.kvs().len());
        for kv in resp.kvs() {
            let key = String::from_utf8_lossy(kv.key()).to_string();
            match self.from_wire(&key, kv.value()) {
                Ok(intent) => intents.push(intent),
                Err(e) => warn!("[registry] failed to parse key {key}: {e}"),
            }
        }
        Ok(intents)
    }

    async fn register(&self, intent: &RecordIntent) -> Result<(), RegistryError> {
        let mut client = self.client.clone();
        let key = self.next_indexed_key(&mut client, intent.record.name()).await?;
        let value = serde_json::to_vec(&Self::to_wire_value(intent)).expect("EtcdValue always serializes");
        client
            .put(key.as_str(), value, None)
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, intent: &RecordIntent) -> Result<(), RegistryError> {
        let mut client = self.client.clone();
        let base = self.base_key(intent.record.name());
        let resp = client
            .get(base.as_str(), Some(GetOptions::new().with_prefix()))
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        for kv in resp.kvs() {
            let key = String::from_utf8_lossy(kv.key()).to_string();
            let Ok(existing) = self.from_wire(&key, kv.value()) else {
                continue;
            };
            if existing.record == intent.record
                && existing.hostname == intent.hostname
                && existing.container_name == intent.container_name
            {
                client
                    .delete(key.as_str(), None)
                    .await
                    .map_err(|e| RegistryError::Connection(e.to_string()))?;
                info!("[registry] deleted key {key}");
                return Ok(());
            }
        }
        Ok(())
    }

    async fn lock_transaction(&self, keys: &[String]) -> Result<LockGuard, RegistryError> {
        let mut sorted: Vec<String> = keys.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut client = self.client.clone();
        let mut held: Vec<(String, i64)> = Vec::new();

        for key in &sorted {
            let lock_key = format!("/locks/{key}");
            let lease = client
                .lease_grant(self.lock_ttl.as_secs() as i64, None)
                .await
                .map_err(|e| RegistryError::Connection(e.to_string()))?;
            let lease_id = lease.id();

            let deadline = tokio::time::Instant::now() + self.lock_timeout;
            let mut acquired = false;
            while tokio::time::Instant::now() < deadline {
                let txn = Txn::new()
                    .when(vec![Compare::create_revision(lock_key.as_str(), CompareOp::Equal, 0)])
                    .and_then(vec![TxnOp::put(
                        lock_key.as_str(),
                        self.hostname.as_str(),
                        Some(etcd_client::PutOptions::new().with_lease(lease_id)),
                    )]);
                let resp = client
                    .txn(txn)
                    .await
                    .map_err(|e| RegistryError::Connection(e.to_string()))?;
                if resp.succeeded() {
                    acquired = true;
                    held.push((lock_key, lease_id));
                    break;
                }
                tokio::time::sleep(self.lock_retry_interval).await;
            }

            if !acquired {
                release_all(&mut client, &held).await;
                return Err(RegistryError::LockTimeout(key.clone()));
            }
        }

        Ok(LockGuard {
            client: self.client.clone(),
            held,
        })
    }
}

async fn release_all(client: &mut Client, held: &[(String, i64)]) {
    for (lock_key, lease_id) in held.iter().rev() {
        let _ = client.delete(lock_key.as_str(), None).await;
        let _ = client.lease_revoke(*lease_id).await;
    }
}

/// RAII guard releasing every lock key (and revoking its lease) in LIFO
/// order when dropped, so a `?`-propagated error during a reconcile pass
/// cannot leak a lock across ticks.
pub struct LockGuard {
    client: Client,
    held: Vec<(String, i64)>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut client = self.client.clone();
        let held = std::mem::take(&mut self.held);
        tokio::spawn(async move {
            release_all(&mut client, &held).await;
        });
    }
}

/// The hierarchical key root under which a name's indexed entries live:
/// `{path_prefix}/{reversed-dotted-labels}`.
fn base_key(path_prefix: &str, fqdn: &str) -> String {
    let parts: Vec<&str> = fqdn.trim_matches('.').split('.').rev().collect();
    format!("{path_prefix}/{}", parts.join("/"))
}

/// The inverse of [`base_key`] plus its `/xN` suffix: recovers the
/// original dotted name from a persisted key.
fn key_to_fqdn(path_prefix: &str, key: &str) -> String {
    let stripped = key.strip_prefix(path_prefix).unwrap_or(key).trim_matches('/');
    let parts: Vec<&str> = stripped.split('/').collect();
    let labels = if parts
        .last()
        .is_some_and(|s| s.starts_with('x') && s[1..].parse::<u32>().is_ok())
    {
        &parts[..parts.len() - 1]
    } else {
        &parts[..]
    };
    labels.iter().rev().cloned().collect::<Vec<_>>().join(".")
}
