// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cross-host reconciliation against the shared registry.
//!
//! [`reconcile`] takes the host's already-[`crate::local_filter`]-resolved
//! desired set and the registry's full actual set, and decides what to add
//! and what to remove so that the registry converges toward `desired`
//! without ever violating a DNS invariant — even transiently, since
//! [`crate::validator::validate`] runs against a simulated post-apply set
//! before any individual add is accepted.

use tracing::warn;

use crate::intent::RecordIntent;
use crate::local_filter::{precedence_wins, sort_key};
use crate::metrics;
use crate::record::RecordType;
use crate::validator::validate;

/// The plan produced by a single reconcile pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Intents to persist to the registry.
    pub to_add: Vec<RecordIntent>,
    /// Intents to delete from the registry — both stale host-owned
    /// entries and entries evicted to make room for a winning intent.
    pub to_remove: Vec<RecordIntent>,
}

/// Reconciles `desired` (this host's locally-filtered wanted set) against
/// `actual` (the registry's full state across every host), deciding adds
/// and removals per the three-phase algorithm: stale sweep, per-desired
/// eviction resolution, then simulate-validate-commit.
///
/// Running this twice with identical `(desired, actual)` yields identical
/// `to_add`/`to_remove` as sets, independent of how either list was
/// ordered on entry.
#[must_use]
pub fn reconcile(desired: Vec<RecordIntent>, actual: Vec<RecordIntent>, this_host: &str) -> ReconcileOutcome {
    let mut to_remove: Vec<RecordIntent> = Vec::new();
    let mut current: Vec<RecordIntent> = Vec::new();

    // Phase 1: stale sweep. Only this host's own orphaned records are
    // ever removed here; another host's abandoned records are that
    // host's responsibility.
    for a in actual {
        let still_desired = desired.iter().any(|d| *d == a);
        if !still_desired && a.hostname == this_host {
            to_remove.push(a);
        } else {
            current.push(a);
        }
    }

    let mut sorted_desired = desired;
    sorted_desired.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let mut to_add: Vec<RecordIntent> = Vec::new();

    for d in sorted_desired {
        let (evictions, skip) = resolve(&d, &current);
        if skip {
            continue;
        }

        // Phase 3: simulate the post-apply set and validate before
        // committing. Eviction is all-or-nothing per desired intent.
        let simulated: Vec<RecordIntent> = current
            .iter()
            .filter(|r| !evictions.contains(r))
            .cloned()
            .collect();

        match validate(&d, &simulated) {
            Ok(()) => {
                for evicted in &evictions {
                    metrics::record_evicted(evicted.record.record_type().as_str());
                }
                current.retain(|r| !evictions.contains(r));
                current.push(d.clone());
                to_remove.extend(evictions);
                to_add.push(d);
            }
            Err(e) => {
                warn!(
                    "[reconciler] discarding {} (validation failed: {e})",
                    d.record.render()
                );
                metrics::record_validation_failure(e.rule());
            }
        }
    }

    ReconcileOutcome { to_add, to_remove }
}

/// Phase 2: decides, for a single desired intent against the current
/// remote state, which remote records it would evict and whether `d`
/// should be skipped outright (already present as an equal intent, or
/// loses precedence to its remote competitor).
fn resolve(d: &RecordIntent, current: &[RecordIntent]) -> (Vec<RecordIntent>, bool) {
    let name = d.record.name();

    let remote_a: Vec<&RecordIntent> = current
        .iter()
        .filter(|r| r.record.name() == name && r.record.record_type() == RecordType::A)
        .collect();
    let remote_cname = current
        .iter()
        .find(|r| r.record.name() == name && r.record.record_type() == RecordType::Cname);

    let mut evictions: Vec<RecordIntent> = Vec::new();

    match d.record.record_type() {
        RecordType::A => {
            if let Some(cname) = remote_cname {
                if precedence_wins(d, cname) {
                    evictions.push(cname.clone());
                } else {
                    return (evictions, true);
                }
            }

            if let Some(existing) = remote_a
                .iter()
                .find(|r| r.record.value() == d.record.value())
            {
                if *existing == d {
                    return (evictions, true);
                }
                if precedence_wins(d, existing) {
                    evictions.push((*existing).clone());
                } else {
                    return (evictions, true);
                }
            }
        }
        RecordType::Cname => {
            if !remote_a.is_empty() {
                if remote_a.iter().all(|r| precedence_wins(d, r)) {
                    evictions.extend(remote_a.iter().map(|r| (*r).clone()));
                } else {
                    return (evictions, true);
                }
            }

            if let Some(cname) = remote_cname {
                if cname == d {
                    return (evictions, true);
                }
                if precedence_wins(d, cname) {
                    evictions.push(cname.clone());
                } else {
                    return (evictions, true);
                }
            }
        }
    }

    (evictions, false)
}

