// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # coredns-sync
//!
//! A per-host daemon that projects the DNS intent declared by locally
//! running containers onto a shared, cluster-wide record store (an
//! etcd-backed zone consumed by a DNS server such as CoreDNS/SkyDNS).
//!
//! ## Overview
//!
//! Each host watches its own container lifecycle events, derives the DNS
//! records each container wants from its labels, and continuously
//! reconciles the union of wanted records (across every host
//! participating in the cluster) against the records actually present in
//! etcd — adding, removing, and resolving conflicts deterministically so
//! that two hosts with identical inputs converge to the same result
//! without needing to talk to each other directly.
//!
//! ## Modules
//!
//! - [`record`] - Typed DNS records (`A`, `CNAME`) with validation
//! - [`intent`] - [`intent::RecordIntent`]: a record plus its provenance
//! - [`labels`] - Maps container labels to a list of [`intent::RecordIntent`]
//! - [`state`] - In-memory tracker of container id -> desired intents
//! - [`validator`] - Enforces DNS invariants on a candidate record set
//! - [`local_filter`] - Intra-host conflict resolution across desired intents
//! - [`reconciler`] - Desired vs. actual diff, eviction, simulation-validated apply plan
//! - [`registry`] - The shared record store contract, plus an etcd-backed implementation
//! - [`events`] - The container event source contract, plus a Docker-backed implementation
//! - [`sync`] - Drives event handling and the periodic reconcile pass
//! - [`config`] - Environment-driven daemon configuration
//! - [`error`] - Crate-wide error taxonomy
//! - [`metrics`] - Prometheus metrics for reconciliation passes

pub mod config;
pub mod error;
pub mod events;
pub mod intent;
pub mod labels;
pub mod local_filter;
pub mod metrics;
pub mod record;
pub mod reconciler;
pub mod registry;
pub mod state;
pub mod sync;
pub mod validator;

#[cfg(test)]
mod reconciler_tests;
#[cfg(test)]
mod validator_tests;
