// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory tracker of per-container desired DNS state.
//!
//! [`StateTracker`] is the single source of truth for "what does this host
//! currently want". It is written to by the event handler and read by the
//! periodic reconcile pass; see the crate's concurrency notes in
//! [`crate::sync`] for how the two sides stay consistent without holding a
//! lock across an await point.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::intent::RecordIntent;

/// Lifecycle status of a tracked container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// The container is running and its intents are desired.
    Running,
    /// The container has stopped; its intents are no longer desired but
    /// the entry is kept around briefly so a stale sweep can still see it.
    Removed,
}

/// The tracked state for a single container.
#[derive(Debug, Clone)]
pub struct ContainerState {
    /// Docker container id.
    pub container_id: String,
    /// Docker container name.
    pub container_name: String,
    /// UTC container creation time.
    pub container_created: DateTime<Utc>,
    /// The intents this container currently declares.
    pub record_intents: Vec<RecordIntent>,
    /// Running or removed.
    pub status: ContainerStatus,
    /// Monotonic time of the last `upsert`/`mark_removed` call, used for
    /// staleness.
    pub last_updated: Instant,
}

impl ContainerState {
    /// Whether this entry has gone longer than `ttl` without an update.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.last_updated.elapsed() > ttl
    }
}

/// Mapping of container id to tracked state. Single-writer from the event
/// handler's perspective; see [`crate::sync::SyncLoop`] for the mutex that
/// makes that safe across the event and sync tasks.
#[derive(Debug, Default)]
pub struct StateTracker {
    containers: HashMap<String, ContainerState>,
}

impl StateTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        StateTracker {
            containers: HashMap::new(),
        }
    }

    /// Inserts or replaces a container's tracked state. There is no
    /// in-place mutation of intents: a later `start` event fully replaces
    /// the prior entry.
    pub fn upsert(
        &mut self,
        container_id: &str,
        container_name: &str,
        container_created: DateTime<Utc>,
        record_intents: Vec<RecordIntent>,
        status: ContainerStatus,
    ) {
        self.containers.insert(
            container_id.to_string(),
            ContainerState {
                container_id: container_id.to_string(),
                container_name: container_name.to_string(),
                container_created,
                record_intents,
                status,
                last_updated: Instant::now(),
            },
        );
    }

    /// Marks a tracked container as removed, refreshing `last_updated`.
    /// A no-op if the container was never tracked.
    pub fn mark_removed(&mut self, container_id: &str) {
        if let Some(state) = self.containers.get_mut(container_id) {
            state.status = ContainerStatus::Removed;
            state.last_updated = Instant::now();
        }
    }

    /// The flattened intents of every tracked container whose status is
    /// `Running`. Empty if the tracker is empty.
    #[must_use]
    pub fn get_all_desired_record_intents(&self) -> Vec<RecordIntent> {
        self.containers
            .values()
            .filter(|state| state.status == ContainerStatus::Running)
            .flat_map(|state| state.record_intents.clone())
            .collect()
    }

    /// Drops every entry whose `last_updated` is older than `ttl`.
    pub fn remove_stale(&mut self, ttl: Duration) {
        self.containers.retain(|_, state| !state.is_stale(ttl));
    }

    /// Number of tracked containers, for diagnostics/tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether the tracker holds no containers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
