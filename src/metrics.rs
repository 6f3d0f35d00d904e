// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the sync daemon.
//!
//! All metrics are registered in [`METRICS_REGISTRY`] and exposed over the
//! `/metrics` endpoint `main.rs` serves alongside the sync loop.

use std::sync::LazyLock;

use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};

const METRICS_NAMESPACE: &str = "coredns_sync";

/// Global Prometheus metrics registry.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total reconcile passes run, by outcome (`committed`, `skipped_lock_timeout`, `aborted`).
pub static PASSES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_passes_total"),
        "Total reconcile passes run by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Records added to the registry, by record type.
pub static RECORDS_ADDED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_added_total"),
        "Total records registered, by record type",
    );
    let counter = CounterVec::new(opts, &["record_type"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Records removed from the registry, by record type and reason.
pub static RECORDS_REMOVED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_removed_total"),
        "Total records removed, by record type and reason",
    );
    let counter = CounterVec::new(opts, &["record_type", "reason"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Desired intents evicted in favor of a higher-precedence competitor.
pub static RECORDS_EVICTED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_evicted_total"),
        "Total desired intents evicted by a higher-precedence competitor",
    );
    let counter = CounterVec::new(opts, &["record_type"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Candidate intents rejected by the validator, by rule violated.
pub static VALIDATION_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_validation_failures_total"),
        "Total candidate intents rejected by the validator, by rule",
    );
    let counter = CounterVec::new(opts, &["rule"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Cross-host lock acquisition timeouts.
pub static LOCK_TIMEOUTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_lock_timeouts_total"),
        "Total cross-host reconcile lock acquisition timeouts",
    );
    let counter = CounterVec::new(opts, &["scope"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Records a finished pass.
pub fn record_pass(outcome: &str) {
    PASSES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Records a registry addition.
pub fn record_added(record_type: &str) {
    RECORDS_ADDED_TOTAL.with_label_values(&[record_type]).inc();
}

/// Records a registry removal.
pub fn record_removed(record_type: &str, reason: &str) {
    RECORDS_REMOVED_TOTAL
        .with_label_values(&[record_type, reason])
        .inc();
}

/// Records an eviction decided by the reconciler's precedence rule.
pub fn record_evicted(record_type: &str) {
    RECORDS_EVICTED_TOTAL
        .with_label_values(&[record_type])
        .inc();
}

/// Records a validator rejection.
pub fn record_validation_failure(rule: &str) {
    VALIDATION_FAILURES_TOTAL.with_label_values(&[rule]).inc();
}

/// Records a lock acquisition timeout.
pub fn record_lock_timeout(scope: &str) {
    LOCK_TIMEOUTS_TOTAL.with_label_values(&[scope]).inc();
}

/// Gathers and encodes all metrics in Prometheus text format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_includes_namespace_and_a_counter() {
        record_pass("committed");
        let text = gather_metrics().unwrap();
        assert!(text.contains("coredns_sync"));
        assert!(text.contains("passes_total"));
    }
}
