// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Enforces the DNS invariants a candidate record must not violate.
//!
//! [`validate`] is a pure function: it never queries the registry itself,
//! only the already-materialized `existing` set handed to it by the
//! reconciler's simulation step. That keeps I/O out of a hot path and
//! makes the rules themselves trivially testable.

use std::collections::HashMap;

use tracing::warn;

use crate::error::ValidationError;
use crate::intent::RecordIntent;
use crate::record::{Record, RecordType};

/// Validates `candidate` against `existing`, in the fixed rule order the
/// daemon depends on for deterministic conflict messages: A/CNAME
/// coexistence, duplicate CNAME, duplicate A, then CNAME cycle.
pub fn validate(candidate: &RecordIntent, existing: &[RecordIntent]) -> Result<(), ValidationError> {
    let new_record = &candidate.record;
    let name = new_record.name();

    let same_name: Vec<&Record> = existing
        .iter()
        .map(|i| &i.record)
        .filter(|r| r.name() == name)
        .collect();

    let has_a = same_name.iter().any(|r| r.record_type() == RecordType::A);
    let has_cname = same_name
        .iter()
        .any(|r| r.record_type() == RecordType::Cname);

    match new_record.record_type() {
        RecordType::A => {
            // Rule 1: A vs CNAME coexistence.
            if has_cname {
                return Err(ValidationError::ACnameCoexistence {
                    name: name.to_string(),
                    value: new_record.value(),
                });
            }
            // Rule 3: duplicate A (same name + value).
            let duplicate_value = same_name.iter().any(|r| {
                r.record_type() == RecordType::A && r.value() == new_record.value()
            });
            if duplicate_value {
                return Err(ValidationError::DuplicateA {
                    name: name.to_string(),
                    value: new_record.value(),
                });
            }
            Ok(())
        }
        RecordType::Cname => {
            // Rule 1: CNAME vs A coexistence.
            if has_a {
                return Err(ValidationError::CnameACoexistence {
                    name: name.to_string(),
                    value: new_record.value(),
                });
            }
            // Rule 2: duplicate CNAME.
            if has_cname {
                return Err(ValidationError::DuplicateCname {
                    name: name.to_string(),
                    value: new_record.value(),
                });
            }
            // Rule 4: CNAME cycle.
            check_cname_cycle(new_record, existing)
        }
    }
}

/// Builds the CNAME forwarding map from `existing` plus `candidate`,
/// keeping the first occurrence on a duplicate name (and logging it), then
/// walks from `candidate.name` to detect a re-entered node before a
/// terminal (a name absent from the map).
fn check_cname_cycle(candidate: &Record, existing: &[RecordIntent]) -> Result<(), ValidationError> {
    let mut forward_map: HashMap<String, String> = HashMap::new();

    for intent in existing {
        if let Record::Cname { name, value } = &intent.record {
            if forward_map.contains_key(name) {
                warn!(
                    "[validator] duplicate CNAME definitions detected in remote registry for domain {}",
                    name
                );
                continue;
            }
            forward_map.insert(name.clone(), value.clone());
        }
    }
    if let Record::Cname { name, value } = candidate {
        forward_map.insert(name.clone(), value.clone());
    }

    let mut seen = std::collections::HashSet::new();
    let mut node = candidate.name().to_string();
    while let Some(next) = forward_map.get(&node) {
        if seen.contains(&node) {
            return Err(ValidationError::CnameCycle(candidate.name().to_string()));
        }
        seen.insert(node.clone());
        node = next.clone();
    }
    Ok(())
}
