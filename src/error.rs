// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Crate-wide error taxonomy.
//!
//! Each concern gets its own `thiserror` enum, the way record/zone
//! operations get distinct error types — callers that need to match on
//! kind use the typed errors directly.

use thiserror::Error;

/// Errors raised while building a record from a DNS label grammar or
/// constructing a [`crate::record::Record`] directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The record name failed RFC 1123 hostname validation.
    #[error("invalid hostname: {0}")]
    InvalidHostname(String),

    /// An `A` record's value did not parse as an IPv4/IPv6 literal.
    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),

    /// The label grammar named a record type this daemon does not support.
    #[error("unsupported record type: {0}")]
    UnsupportedType(String),
}

/// Errors raised by a [`crate::validator`] pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An `A` record would coexist with a `CNAME` of the same name.
    #[error("{name} -> {value}: cannot add an A record when a CNAME record exists with the same name")]
    ACnameCoexistence {
        /// The conflicting record name.
        name: String,
        /// The candidate's value.
        value: String,
    },

    /// A `CNAME` record would coexist with an `A` of the same name.
    #[error("{name} -> {value}: cannot add a CNAME record when an A record exists with the same name")]
    CnameACoexistence {
        /// The conflicting record name.
        name: String,
        /// The candidate's value.
        value: String,
    },

    /// A second `CNAME` would occupy a name that already has one.
    #[error("{name} -> {value}: cannot have multiple CNAME records with the same name")]
    DuplicateCname {
        /// The conflicting record name.
        name: String,
        /// The candidate's value.
        value: String,
    },

    /// A second `A` record with the same name and value already exists.
    #[error("{name} -> {value}: an A record with the same name and value already exists")]
    DuplicateA {
        /// The conflicting record name.
        name: String,
        /// The candidate's value.
        value: String,
    },

    /// Accepting the candidate would close a `CNAME` resolution cycle.
    #[error("CNAME cycle detected starting at: {0}")]
    CnameCycle(String),
}

impl ValidationError {
    /// A short, stable label for the rule a candidate failed, used as the
    /// `rule` label on [`crate::metrics::VALIDATION_FAILURES_TOTAL`].
    #[must_use]
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::ACnameCoexistence { .. } => "a_cname_coexistence",
            ValidationError::CnameACoexistence { .. } => "cname_a_coexistence",
            ValidationError::DuplicateCname { .. } => "duplicate_cname",
            ValidationError::DuplicateA { .. } => "duplicate_a",
            ValidationError::CnameCycle(_) => "cname_cycle",
        }
    }
}

/// Errors raised by a [`crate::registry::Registry`] implementation.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// The registry backend could not be reached or the RPC failed.
    #[error("registry connection error: {0}")]
    Connection(String),

    /// A persisted entry could not be parsed back into a `RecordIntent`.
    #[error("registry entry at {key} could not be parsed: {reason}")]
    Parse {
        /// The offending key.
        key: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A cross-host lock could not be acquired within `etcd_lock_timeout`.
    #[error("failed to acquire lock on {0} within the configured timeout")]
    LockTimeout(String),
}

/// Errors raised while loading daemon configuration from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that did not parse to its
    /// expected type.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// The environment variable name.
        key: String,
        /// The value that failed to parse.
        value: String,
    },
}
