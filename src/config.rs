// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Environment-driven daemon configuration.
//!
//! No global mutable settings singleton: [`Config`] is loaded once in
//! `main` and passed down to the collaborators that need it
//! ([`crate::labels`], [`crate::registry`], [`crate::sync`]).

use std::net::IpAddr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::record::RecordType;

/// Daemon configuration, loaded from environment variables with the
/// defaults from the registry wire-layout/configuration table.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fallback `A` record value when a container declares a record with
    /// no `.value` label.
    pub host_ip: IpAddr,
    /// This daemon's identity; stamped onto every intent it originates and
    /// used to decide stale-sweep ownership.
    pub hostname: String,
    /// Docker label namespace, e.g. `coredns`.
    pub docker_label_prefix: String,
    /// Record types this daemon will accept from container labels.
    pub allowed_record_types: Vec<RecordType>,
    /// etcd endpoint host.
    pub etcd_host: String,
    /// etcd endpoint port.
    pub etcd_port: u16,
    /// Root path under which records are keyed.
    pub etcd_path_prefix: String,
    /// Lease TTL for cross-host lock keys.
    pub etcd_lock_ttl: Duration,
    /// Bounded wait when acquiring a cross-host lock.
    pub etcd_lock_timeout: Duration,
    /// Poll interval while waiting for a cross-host lock.
    pub etcd_lock_retry_interval: Duration,
    /// How often the sync loop runs a reconcile pass.
    pub poll_interval: Duration,
    /// How long a container may go without an update before its tracked
    /// state is dropped as stale.
    pub state_ttl: Duration,
    /// Log verbosity, e.g. `INFO`, `DEBUG`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host_ip: IpAddr::from([127, 0, 0, 1]),
            hostname: "your-hostname".to_string(),
            docker_label_prefix: "coredns".to_string(),
            allowed_record_types: vec![RecordType::A, RecordType::Cname],
            etcd_host: "localhost".to_string(),
            etcd_port: 2379,
            etcd_path_prefix: "/skydns".to_string(),
            etcd_lock_ttl: Duration::from_secs(5),
            etcd_lock_timeout: Duration::from_secs(2),
            etcd_lock_retry_interval: Duration::from_millis(100),
            poll_interval: Duration::from_secs(5),
            state_ttl: Duration::from_secs(60),
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment, falling back to
    /// [`Config::default`] for anything unset. Returns an error if a
    /// variable is set but fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            host_ip: parse_env("HOST_IP", defaults.host_ip)?,
            hostname: env_or("HOSTNAME", defaults.hostname),
            docker_label_prefix: env_or("DOCKER_LABEL_PREFIX", defaults.docker_label_prefix),
            allowed_record_types: parse_allowed_record_types(defaults.allowed_record_types)?,
            etcd_host: env_or("ETCD_HOST", defaults.etcd_host),
            etcd_port: parse_env("ETCD_PORT", defaults.etcd_port)?,
            etcd_path_prefix: env_or("ETCD_PATH_PREFIX", defaults.etcd_path_prefix),
            etcd_lock_ttl: parse_secs_env("ETCD_LOCK_TTL", defaults.etcd_lock_ttl)?,
            etcd_lock_timeout: parse_secs_env("ETCD_LOCK_TIMEOUT", defaults.etcd_lock_timeout)?,
            etcd_lock_retry_interval: parse_millis_env(
                "ETCD_LOCK_RETRY_INTERVAL",
                defaults.etcd_lock_retry_interval,
            )?,
            poll_interval: parse_secs_env("POLL_INTERVAL", defaults.poll_interval)?,
            state_ttl: parse_secs_env("STATE_TTL", defaults.state_ttl)?,
            log_level: env_or("LOG_LEVEL", defaults.log_level).to_uppercase(),
        })
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
    }
}

fn parse_secs_env(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}

fn parse_millis_env(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}

fn parse_allowed_record_types(default: Vec<RecordType>) -> Result<Vec<RecordType>, ConfigError> {
    let Ok(raw) = std::env::var("ALLOWED_RECORD_TYPES") else {
        return Ok(default);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<RecordType>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "ALLOWED_RECORD_TYPES".to_string(),
                    value: s.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = Config::default();
        assert_eq!(cfg.host_ip, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(cfg.hostname, "your-hostname");
        assert_eq!(cfg.docker_label_prefix, "coredns");
        assert_eq!(cfg.etcd_host, "localhost");
        assert_eq!(cfg.etcd_port, 2379);
        assert_eq!(cfg.etcd_path_prefix, "/skydns");
        assert_eq!(cfg.etcd_lock_ttl, Duration::from_secs(5));
        assert_eq!(cfg.etcd_lock_timeout, Duration::from_secs(2));
        assert_eq!(cfg.etcd_lock_retry_interval, Duration::from_millis(100));
    }
}
