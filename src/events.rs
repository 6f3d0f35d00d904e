// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Container lifecycle events, the input the sync loop reacts to.
//!
//! [`EventSource`] abstracts the origin of [`ContainerEvent`]s so
//! [`crate::sync::SyncLoop`] never depends on Docker directly.
//! [`DockerEventSource`] is the production implementation, built on
//! `bollard`'s async Docker Engine API client.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::query_parameters::{EventsOptionsBuilder, ListContainersOptionsBuilder};
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

/// A single container lifecycle notification.
///
/// `die`/`stop`/`destroy` events carry only `id` and `status`: the
/// container may already be gone by the time it is safe to inspect, so
/// the sync loop treats any non-`start` event as "this id is no longer
/// desired" without needing its labels.
#[derive(Debug, Clone)]
pub struct ContainerEvent {
    /// Docker container id.
    pub id: String,
    /// Docker container name, empty for non-`start` events.
    pub name: String,
    /// UTC creation time, `None` if it could not be determined.
    pub created: Option<DateTime<Utc>>,
    /// One of `start`, `die`, `stop`, `destroy`.
    pub status: String,
    /// Container labels at inspection time, empty for non-`start` events.
    pub labels: HashMap<String, String>,
}

impl ContainerEvent {
    /// Whether this event means the container's records are newly or
    /// still desired.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.status == "start"
    }
}

/// Source of container lifecycle events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Starts delivering events onto `sender`, including a synthetic
    /// `start` event for every container already running. Returns once
    /// the underlying stream ends or is cancelled; an error here is
    /// treated as fatal by `main`, matching the spec's "the event source
    /// is not itself recoverable" design.
    async fn run(&self, sender: Sender<ContainerEvent>) -> anyhow::Result<()>;
}

/// The Docker Engine API-backed [`EventSource`].
pub struct DockerEventSource {
    client: Docker,
}

impl DockerEventSource {
    /// Connects to the local Docker daemon using the platform default
    /// socket.
    pub fn connect() -> anyhow::Result<Self> {
        let client = Docker::connect_with_local_defaults()?;
        Ok(DockerEventSource { client })
    }

    async fn emit_running_containers(&self, sender: &Sender<ContainerEvent>) {
        info!("[events] listing currently running containers");
        let options = ListContainersOptionsBuilder::default()
            .filters(&HashMap::from([("status".to_string(), vec!["running".to_string()])]))
            .build();
        match self.client.list_containers(Some(options)).await {
            Ok(containers) => {
                for container in containers {
                    let Some(id) = container.id.clone() else {
                        continue;
                    };
                    match self.inspect_event(&id, "start").await {
                        Ok(event) => {
                            if sender.send(event).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("[events] failed to inspect running container {id}: {e}"),
                    }
                }
            }
            Err(e) => warn!("[events] failed to list running containers: {e}"),
        }
    }

    async fn inspect_event(&self, id: &str, status: &str) -> anyhow::Result<ContainerEvent> {
        let details = self.client.inspect_container(id, None).await?;
        let name = details
            .name
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default();
        let created = details
            .created
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let labels = details
            .config
            .and_then(|c| c.labels)
            .unwrap_or_default();

        Ok(ContainerEvent {
            id: id.to_string(),
            name,
            created,
            status: status.to_string(),
            labels,
        })
    }
}

#[async_trait]
impl EventSource for DockerEventSource {
    async fn run(&self, sender: Sender<ContainerEvent>) -> anyhow::Result<()> {
        self.emit_running_containers(&sender).await;

        info!("[events] watching for Docker events");
        let options = EventsOptionsBuilder::default()
            .filters(&HashMap::from([("type".to_string(), vec!["container".to_string()])]))
            .build();
        let mut stream = self.client.events(Some(options));

        while let Some(next) = stream.next().await {
            let message = match next {
                Ok(message) => message,
                Err(e) => {
                    warn!("[events] docker event stream error: {e}");
                    continue;
                }
            };

            let Some(status) = message.action.as_deref() else {
                continue;
            };
            if !matches!(status, "start" | "die" | "stop" | "destroy") {
                continue;
            }
            let Some(id) = message.actor.and_then(|actor| actor.id) else {
                continue;
            };

            debug!("[events] received container event: {status} for {id}");

            let event = if status == "start" {
                match self.inspect_event(&id, status).await {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("[events] failed to inspect container after start: {e}");
                        continue;
                    }
                }
            } else {
                ContainerEvent {
                    id,
                    name: String::new(),
                    created: None,
                    status: status.to_string(),
                    labels: HashMap::new(),
                }
            };

            if sender.send(event).await.is_err() {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_start_recognizes_only_the_start_status() {
        let start = ContainerEvent {
            id: "c1".to_string(),
            name: "web".to_string(),
            created: None,
            status: "start".to_string(),
            labels: HashMap::new(),
        };
        let die = ContainerEvent {
            status: "die".to_string(),
            ..start.clone()
        };
        assert!(start.is_start());
        assert!(!die.is_start());
    }
}
