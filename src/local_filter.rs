// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Intra-host reconciliation of a single host's desired intents against
//! themselves.
//!
//! A host can run several containers that declare conflicting records for
//! the same name (an aliased declaration colliding with a base one, or two
//! unrelated containers racing for the same hostname). [`filter`] resolves
//! those conflicts before the result ever reaches the cross-host
//! [`crate::reconciler`], using the same [`precedence_wins`] rule the
//! reconciler itself uses against the registry.

use std::collections::HashMap;

use crate::intent::RecordIntent;
use crate::record::RecordType;

/// The current occupant(s) of a name's slot while folding.
enum Slot {
    A(Vec<RecordIntent>),
    Cname(RecordIntent),
}

/// Resolves `desired` down to, per name, either zero or more `A` intents
/// of distinct values, or exactly one `CNAME` intent.
///
/// Intents are processed in the crate's canonical total order —
/// `(name, record_type, value, hostname, container_name, container_id)` —
/// so that the result does not depend on the order the caller happened to
/// collect them in, which makes the function idempotent:
/// `filter(filter(xs)) == filter(xs)`.
#[must_use]
pub fn filter(desired: Vec<RecordIntent>) -> Vec<RecordIntent> {
    let mut sorted = desired;
    sorted.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let mut slots: HashMap<String, Slot> = HashMap::new();

    for intent in sorted {
        let name = intent.record.name().to_string();
        match intent.record.record_type() {
            RecordType::A => apply_a(&mut slots, name, intent),
            RecordType::Cname => apply_cname(&mut slots, name, intent),
        }
    }

    slots
        .into_values()
        .flat_map(|slot| match slot {
            Slot::A(intents) => intents,
            Slot::Cname(intent) => vec![intent],
        })
        .collect()
}

/// The crate's canonical total order over intents — `(name, record_type,
/// value, hostname, container_name, container_id)` — shared with
/// [`crate::reconciler`] so both modules produce identical plans
/// regardless of the order intents were collected in.
pub(crate) fn sort_key(intent: &RecordIntent) -> (String, &'static str, String, String, String, String) {
    (
        intent.record.name().to_string(),
        intent.record.record_type().as_str(),
        intent.record.value(),
        intent.hostname.clone(),
        intent.container_name.clone(),
        intent.container_id.clone(),
    )
}

fn apply_a(slots: &mut HashMap<String, Slot>, name: String, incoming: RecordIntent) {
    match slots.get_mut(&name) {
        None => {
            slots.insert(name, Slot::A(vec![incoming]));
        }
        Some(Slot::Cname(existing_cname)) => {
            if precedence_wins(&incoming, existing_cname) {
                slots.insert(name, Slot::A(vec![incoming]));
            }
            // else: drop incoming, CNAME keeps the slot.
        }
        Some(Slot::A(existing)) => {
            let collision = existing
                .iter()
                .position(|e| e.record.value() == incoming.record.value());
            match collision {
                Some(idx) => {
                    if precedence_wins(&incoming, &existing[idx]) {
                        existing[idx] = incoming;
                    }
                }
                None => existing.push(incoming),
            }
        }
    }
}

fn apply_cname(slots: &mut HashMap<String, Slot>, name: String, incoming: RecordIntent) {
    match slots.get_mut(&name) {
        None => {
            slots.insert(name, Slot::Cname(incoming));
        }
        Some(Slot::Cname(existing)) => {
            if precedence_wins(&incoming, existing) {
                slots.insert(name, Slot::Cname(incoming));
            }
        }
        Some(Slot::A(existing_as)) => {
            if cname_beats_all(&incoming, existing_as) {
                slots.insert(name, Slot::Cname(incoming));
            }
            // else: drop the CNAME, the A set keeps the slot.
        }
    }
}

/// The Precedence Rule between two intents competing for the same single
/// slot: force beats non-force; among equal force, the older `created`
/// wins; exact ties keep whichever already held the slot.
#[must_use]
pub fn precedence_wins(new: &RecordIntent, existing: &RecordIntent) -> bool {
    if new.force && !existing.force {
        true
    } else if !new.force && existing.force {
        false
    } else {
        new.created < existing.created
    }
}

/// Whether a new CNAME wins a slot currently held by one or more `A`
/// records: the CNAME must beat every occupying `A` under the Precedence
/// Rule, individually — a single `A` that the CNAME does not beat keeps
/// the whole set in place.
fn cname_beats_all(new: &RecordIntent, existing: &[RecordIntent]) -> bool {
    existing.iter().all(|e| precedence_wins(new, e))
}
