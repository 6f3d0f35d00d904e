// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! A [`Record`] together with the provenance needed to arbitrate conflicts
//! across hosts and containers.

use chrono::{DateTime, Utc};

use crate::record::Record;

/// A desired or actual DNS record, tagged with the host/container that
/// wants it (or, once read back from the registry, that owns it).
///
/// Equality is by `(container_id, container_name, hostname, force, record)`
/// — provenance is part of identity, so the same logical record declared by
/// two different containers is two distinct intents, even if they would
/// occupy the same registry slot. `created` is deliberately excluded: it is
/// the Precedence Rule's tie-breaker, not identity, so two observations of
/// the same container's intent that disagree only on a sub-second `created`
/// skew (e.g. re-derived across a daemon restart) still compare equal.
#[derive(Debug, Clone)]
pub struct RecordIntent {
    /// The record this intent wants persisted.
    pub record: Record,
    /// The daemon hostname that originated this intent.
    pub hostname: String,
    /// The id of the container that declared this intent.
    pub container_id: String,
    /// The name of the container that declared this intent.
    pub container_name: String,
    /// UTC creation time of the owning container; the tie-breaker for
    /// non-force conflicts (older wins).
    pub created: DateTime<Utc>,
    /// Whether this intent overrides precedence regardless of age.
    pub force: bool,
}

impl PartialEq for RecordIntent {
    fn eq(&self, other: &Self) -> bool {
        self.container_id == other.container_id
            && self.container_name == other.container_name
            && self.hostname == other.hostname
            && self.force == other.force
            && self.record == other.record
    }
}

impl Eq for RecordIntent {}

impl RecordIntent {
    /// The identity key at which this intent's record occupies a slot in
    /// the registry: `(name, record_type, value)`. Two intents from
    /// different hosts/containers that share a slot key compete for it
    /// during reconciliation even though they are not equal intents.
    #[must_use]
    pub fn slot_key(&self) -> (String, crate::record::RecordType, String) {
        (
            self.record.name().to_string(),
            self.record.record_type(),
            self.record.value(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(hostname: &str, container_id: &str, created_secs: i64) -> RecordIntent {
        RecordIntent {
            record: Record::new_a("api.example.com", "10.0.0.1").unwrap(),
            hostname: hostname.to_string(),
            container_id: container_id.to_string(),
            container_name: "web".to_string(),
            created: DateTime::from_timestamp(created_secs, 0).unwrap(),
            force: false,
        }
    }

    #[test]
    fn same_record_different_container_is_distinct_intent() {
        let a = intent("hostA", "c1", 1000);
        let b = intent("hostA", "c2", 1000);
        assert_ne!(a, b);
        assert_eq!(a.slot_key(), b.slot_key());
    }

    #[test]
    fn force_is_part_of_identity() {
        let mut a = intent("hostA", "c1", 1000);
        let b = a.clone();
        a.force = true;
        assert_ne!(a, b);
    }
}
