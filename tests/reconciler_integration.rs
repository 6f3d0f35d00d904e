// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! End-to-end exercise of the label → state → local filter → reconciler
//! pipeline across two simulated hosts sharing one in-memory record store,
//! without any live etcd or Docker daemon.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coredns_sync::config::Config;
use coredns_sync::intent::RecordIntent;
use coredns_sync::labels::build_record_intents;
use coredns_sync::local_filter;
use coredns_sync::reconciler::reconcile;
use coredns_sync::state::{ContainerStatus, StateTracker};

fn config_for(hostname: &str) -> Config {
    Config {
        hostname: hostname.to_string(),
        ..Config::default()
    }
}

fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Runs a single host's reconcile step against the shared store, applying
/// the resulting plan directly (standing in for `Registry::register`/
/// `Registry::remove` against an in-process store rather than etcd).
fn run_pass(store: &mut Vec<RecordIntent>, tracker: &StateTracker, hostname: &str) {
    let desired = local_filter::filter(tracker.get_all_desired_record_intents());
    let outcome = reconcile(desired, store.clone(), hostname);

    for removed in &outcome.to_remove {
        store.retain(|r| r != removed);
    }
    store.extend(outcome.to_add);
}

#[test]
fn two_hosts_converge_on_distinct_names_without_conflict() {
    let config_a = config_for("hostA");
    let config_b = config_for("hostB");

    let mut tracker_a = StateTracker::new();
    let intents_a = build_record_intents(
        &config_a,
        "c1",
        "web-a",
        ts(1000),
        &labels(&[
            ("coredns.enabled", "true"),
            ("coredns.A.name", "a.example.com"),
            ("coredns.A.value", "10.0.0.1"),
        ]),
    );
    tracker_a.upsert("c1", "web-a", ts(1000), intents_a, ContainerStatus::Running);

    let mut tracker_b = StateTracker::new();
    let intents_b = build_record_intents(
        &config_b,
        "c2",
        "web-b",
        ts(1000),
        &labels(&[
            ("coredns.enabled", "true"),
            ("coredns.A.name", "b.example.com"),
            ("coredns.A.value", "10.0.0.2"),
        ]),
    );
    tracker_b.upsert("c2", "web-b", ts(1000), intents_b, ContainerStatus::Running);

    let mut store: Vec<RecordIntent> = Vec::new();
    run_pass(&mut store, &tracker_a, "hostA");
    run_pass(&mut store, &tracker_b, "hostB");

    assert_eq!(store.len(), 2);
    assert!(store.iter().any(|i| i.record.name() == "a.example.com"));
    assert!(store.iter().any(|i| i.record.name() == "b.example.com"));
}

#[test]
fn a_later_forced_declaration_evicts_an_older_unforced_remote_record() {
    let config_a = config_for("hostA");
    let config_b = config_for("hostB");

    let mut tracker_a = StateTracker::new();
    let intents_a = build_record_intents(
        &config_a,
        "c1",
        "web-a",
        ts(1000),
        &labels(&[
            ("coredns.enabled", "true"),
            ("coredns.A.name", "api.example.com"),
            ("coredns.A.value", "10.0.0.1"),
        ]),
    );
    tracker_a.upsert("c1", "web-a", ts(1000), intents_a, ContainerStatus::Running);

    let mut store: Vec<RecordIntent> = Vec::new();
    run_pass(&mut store, &tracker_a, "hostA");
    assert_eq!(store.len(), 1);
    let original_owner = store[0].hostname.clone();
    assert_eq!(original_owner, "hostA");

    let mut tracker_b = StateTracker::new();
    let intents_b = build_record_intents(
        &config_b,
        "c2",
        "web-b",
        ts(2000),
        &labels(&[
            ("coredns.enabled", "true"),
            ("coredns.force", "true"),
            ("coredns.A.name", "api.example.com"),
            ("coredns.A.value", "10.0.0.2"),
        ]),
    );
    tracker_b.upsert("c2", "web-b", ts(2000), intents_b, ContainerStatus::Running);

    run_pass(&mut store, &tracker_b, "hostB");

    assert_eq!(store.len(), 1);
    assert_eq!(store[0].hostname, "hostB");
    assert_eq!(store[0].record.value(), "10.0.0.2");
}

#[test]
fn removing_a_container_is_swept_on_the_next_pass_from_its_own_host() {
    let config_a = config_for("hostA");
    let mut tracker = StateTracker::new();
    let intents = build_record_intents(
        &config_a,
        "c1",
        "web-a",
        ts(1000),
        &labels(&[
            ("coredns.enabled", "true"),
            ("coredns.A.name", "api.example.com"),
            ("coredns.A.value", "10.0.0.1"),
        ]),
    );
    tracker.upsert("c1", "web-a", ts(1000), intents, ContainerStatus::Running);

    let mut store: Vec<RecordIntent> = Vec::new();
    run_pass(&mut store, &tracker, "hostA");
    assert_eq!(store.len(), 1);

    tracker.mark_removed("c1");
    run_pass(&mut store, &tracker, "hostA");
    assert!(store.is_empty());
}

#[test]
fn a_cname_cannot_be_installed_over_an_existing_a_record_from_another_host() {
    let config_a = config_for("hostA");
    let config_b = config_for("hostB");

    let mut tracker_a = StateTracker::new();
    let intents_a = build_record_intents(
        &config_a,
        "c1",
        "web-a",
        ts(1000),
        &labels(&[
            ("coredns.enabled", "true"),
            ("coredns.A.name", "api.example.com"),
            ("coredns.A.value", "10.0.0.1"),
        ]),
    );
    tracker_a.upsert("c1", "web-a", ts(1000), intents_a, ContainerStatus::Running);

    let mut store: Vec<RecordIntent> = Vec::new();
    run_pass(&mut store, &tracker_a, "hostA");

    let mut tracker_b = StateTracker::new();
    let intents_b = build_record_intents(
        &config_b,
        "c2",
        "web-b",
        ts(2000),
        &labels(&[
            ("coredns.enabled", "true"),
            ("coredns.CNAME.name", "api.example.com"),
            ("coredns.CNAME.value", "backend.example.com"),
        ]),
    );
    tracker_b.upsert("c2", "web-b", ts(2000), intents_b, ContainerStatus::Running);

    run_pass(&mut store, &tracker_b, "hostB");

    assert_eq!(store.len(), 1);
    assert_eq!(store[0].record.record_type().as_str(), "A");
}
