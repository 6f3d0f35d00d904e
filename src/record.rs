// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed DNS records.
//!
//! A [`Record`] is a closed, immutable variant over the two record types the
//! daemon projects into the shared zone: `A` and `CNAME`. Construction
//! validates the name and value per RFC 1123/IP-literal rules so that an
//! invalid [`Record`] cannot exist once built.

use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::RecordError;

/// Matches a single RFC 1123 hostname label: 1-63 alphanumerics/hyphens,
/// never leading or trailing with a hyphen.
static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("static hostname regex is valid")
});

/// Validates a hostname against RFC 1123: at most 255 characters total,
/// labels of 1-63 characters using alphanumerics and `-`, never leading or
/// trailing a label with `-`.
#[must_use]
pub fn is_valid_hostname(name: &str) -> bool {
    !name.is_empty() && name.len() <= 255 && HOSTNAME_RE.is_match(name)
}

/// The discriminant for a [`Record`]'s variant, as it appears on the wire
/// (`"A"` or `"CNAME"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RecordType {
    /// An address record.
    A,
    /// A canonical-name alias record.
    #[serde(rename = "CNAME")]
    Cname,
}

impl RecordType {
    /// The string form used in the registry wire format and in labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "CNAME" => Ok(RecordType::Cname),
            other => Err(RecordError::UnsupportedType(other.to_string())),
        }
    }
}

/// A single DNS record, immutable once constructed.
///
/// Equality and the identity key `(name, record_type, value)` used
/// throughout reconciliation are derived from the fields directly since
/// there is no hidden mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Record {
    /// `name` resolves to the IPv4/IPv6 literal `value`.
    A {
        /// Fully qualified record name.
        name: String,
        /// An IPv4 or IPv6 literal.
        value: IpAddr,
    },
    /// `name` is an alias for the hostname `value`.
    Cname {
        /// Fully qualified record name.
        name: String,
        /// Target hostname.
        value: String,
    },
}

impl Record {
    /// Builds an `A` record, validating `name` as a hostname and `value` as
    /// an IP literal.
    pub fn new_a(name: impl Into<String>, value: &str) -> Result<Self, RecordError> {
        let name = name.into();
        if !is_valid_hostname(&name) {
            return Err(RecordError::InvalidHostname(name));
        }
        let value: IpAddr = value
            .parse()
            .map_err(|_| RecordError::InvalidIpAddress(value.to_string()))?;
        Ok(Record::A { name, value })
    }

    /// Builds a `CNAME` record, validating both `name` and `value` as
    /// hostnames.
    pub fn new_cname(name: impl Into<String>, value: impl Into<String>) -> Result<Self, RecordError> {
        let name = name.into();
        let value = value.into();
        if !is_valid_hostname(&name) {
            return Err(RecordError::InvalidHostname(name));
        }
        if !is_valid_hostname(&value) {
            return Err(RecordError::InvalidHostname(value));
        }
        Ok(Record::Cname { name, value })
    }

    /// The record's name (left-hand side).
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Record::A { name, .. } | Record::Cname { name, .. } => name,
        }
    }

    /// The record's value (right-hand side) rendered as a string.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Record::A { value, .. } => value.to_string(),
            Record::Cname { value, .. } => value.clone(),
        }
    }

    /// The derived discriminant, never stored separately from the variant.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::A { .. } => RecordType::A,
            Record::Cname { .. } => RecordType::Cname,
        }
    }

    /// A short human-readable rendering for logs, e.g. `api.example.com -> 10.0.0.1`.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{} -> {}", self.name(), self.value())
    }
}
