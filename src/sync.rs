// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Drives event handling and the periodic reconcile pass.
//!
//! [`SyncLoop`] owns no I/O itself beyond what it is handed: a
//! [`crate::events::EventSource`], a [`crate::registry::Registry`], and the
//! shared [`StateTracker`]. It runs as two cooperating Tokio tasks under
//! [`SyncLoop::run`] — one draining events into the tracker, one ticking
//! the reconcile pass — coordinated by a [`CancellationToken`] rather than
//! a raw `running` flag, matching Tokio's idiomatic shutdown primitive.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::events::{ContainerEvent, EventSource};
use crate::labels::build_record_intents;
use crate::local_filter;
use crate::metrics;
use crate::reconciler::reconcile;
use crate::registry::Registry;
use crate::state::{ContainerStatus, StateTracker};

/// The well-known key the coarse cross-host reconcile lock is scoped to.
/// A single key covering the whole pass, per the design's "coarse
/// transactional lock" — fine-grained per-name locking is not attempted.
const GLOBAL_LOCK_KEY: &str = "__global__";

/// Drives the daemon's two long-running activities: consuming container
/// events into the [`StateTracker`], and periodically reconciling the
/// tracker's desired state against the registry.
pub struct SyncLoop {
    config: Config,
    registry: Arc<dyn Registry>,
    events: Arc<dyn EventSource>,
    tracker: Arc<Mutex<StateTracker>>,
}

impl SyncLoop {
    /// Builds a sync loop over the given collaborators.
    #[must_use]
    pub fn new(config: Config, registry: Arc<dyn Registry>, events: Arc<dyn EventSource>) -> Self {
        SyncLoop {
            config,
            registry,
            events,
            tracker: Arc::new(Mutex::new(StateTracker::new())),
        }
    }

    /// Runs the event task and the periodic reconcile task until
    /// `shutdown` is cancelled, then returns once both have wound down.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> anyhow::Result<()> {
        let (tx, rx) = mpsc::channel::<ContainerEvent>(256);

        let event_source = self.events.clone();
        let event_shutdown = shutdown.clone();
        let event_task = tokio::spawn(async move {
            tokio::select! {
                result = event_source.run(tx) => {
                    if let Err(e) = result {
                        error!("[sync] event source terminated with an error: {e}");
                    }
                }
                () = event_shutdown.cancelled() => {
                    info!("[sync] event task stopping on shutdown signal");
                }
            }
        });

        let this = self.clone();
        let handler_shutdown = shutdown.clone();
        let handler_task = tokio::spawn(async move {
            this.drain_events(rx, handler_shutdown).await;
        });

        let this = self.clone();
        let pass_shutdown = shutdown.clone();
        let pass_task = tokio::spawn(async move {
            this.run_periodic_passes(pass_shutdown).await;
        });

        let _ = tokio::join!(event_task, handler_task, pass_task);
        Ok(())
    }

    /// Applies each incoming [`ContainerEvent`] to the tracker until the
    /// channel closes or shutdown is requested.
    async fn drain_events(&self, mut rx: mpsc::Receiver<ContainerEvent>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => break,
                    }
                }
                () = shutdown.cancelled() => break,
            }
        }
    }

    fn handle_event(&self, event: ContainerEvent) {
        if event.is_start() {
            let created = event.created.unwrap_or_else(chrono::Utc::now);
            let intents = build_record_intents(&self.config, &event.id, &event.name, created, &event.labels);
            if intents.is_empty() {
                debug!("[sync] container {} start produced no record intents", event.id);
                return;
            }
            self.tracker
                .lock()
                .upsert(&event.id, &event.name, created, intents, ContainerStatus::Running);
        } else {
            debug!("[sync] container {} {} — marking removed", event.id, event.status);
            self.tracker.lock().mark_removed(&event.id);
        }
    }

    /// Ticks a reconcile pass every `poll_interval`, until shutdown.
    async fn run_periodic_passes(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tracker.lock().remove_stale(self.config.state_ttl);
                    if let Err(e) = self.run_pass().await {
                        warn!("[sync] reconcile pass aborted: {e}");
                        metrics::record_pass("aborted");
                    }
                }
                () = shutdown.cancelled() => {
                    info!("[sync] periodic reconcile task stopping on shutdown signal");
                    break;
                }
            }
        }
    }

    /// Runs a single acquire-list-reconcile-apply-release pass.
    async fn run_pass(&self) -> anyhow::Result<()> {
        let lock = match self
            .registry
            .lock_transaction(&[GLOBAL_LOCK_KEY.to_string()])
            .await
        {
            Ok(lock) => lock,
            Err(e) => {
                debug!("[sync] skipping pass, could not acquire reconcile lock: {e}");
                metrics::record_lock_timeout(GLOBAL_LOCK_KEY);
                metrics::record_pass("skipped_lock_timeout");
                return Ok(());
            }
        };

        let actual = self.registry.list().await?;
        let desired = {
            let tracker = self.tracker.lock();
            tracker.get_all_desired_record_intents()
        };
        let desired = local_filter::filter(desired);

        let outcome = reconcile(desired, actual, &self.config.hostname);

        for intent in &outcome.to_remove {
            let record_type = intent.record.record_type().as_str();
            if let Err(e) = self.registry.remove(intent).await {
                warn!("[sync] failed to remove {}: {e}", intent.record.render());
            } else {
                metrics::record_removed(record_type, "reconcile");
            }
        }
        for intent in &outcome.to_add {
            let record_type = intent.record.record_type().as_str();
            if let Err(e) = self.registry.register(intent).await {
                warn!("[sync] failed to register {}: {e}", intent.record.render());
            } else {
                metrics::record_added(record_type);
            }
        }

        drop(lock);
        metrics::record_pass("committed");
        Ok(())
    }
}
