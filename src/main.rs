// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use coredns_sync::config::Config;
use coredns_sync::events::DockerEventSource;
use coredns_sync::metrics;
use coredns_sync::registry::EtcdRegistry;
use coredns_sync::sync::SyncLoop;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
const METRICS_SERVER_PORT: u16 = 9153;
const METRICS_SERVER_PATH: &str = "/metrics";

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("coredns-sync")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initializes logging. Respects `RUST_LOG` if set, otherwise falls back to
/// the daemon's configured `log_level`; respects `RUST_LOG_FORMAT` (`json`
/// or `text`, default `text`).
fn initialize_logging(default_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level.to_lowercase()));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .compact()
                .init();
        }
    }
}

/// Starts the Prometheus metrics HTTP server, serving the gathered text
/// exposition format at `/metrics`.
fn start_metrics_server() -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = METRICS_SERVER_BIND_ADDRESS,
        port = METRICS_SERVER_PORT,
        path = METRICS_SERVER_PATH,
        "starting Prometheus metrics HTTP server"
    );

    tokio::spawn(async move {
        async fn metrics_handler() -> String {
            match metrics::gather_metrics() {
                Ok(text) => text,
                Err(e) => {
                    error!("failed to gather metrics: {e}");
                    String::from("# error gathering metrics\n")
                }
            }
        }

        let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
        let bind_addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{METRICS_SERVER_PORT}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };

        info!("metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("metrics server error: {e}");
        }
    })
}

async fn async_main() -> Result<()> {
    let config = Config::from_env().context("loading configuration from the environment")?;
    initialize_logging(&config.log_level);

    info!(hostname = %config.hostname, "starting coredns-sync");
    debug!(?config, "resolved configuration");

    let _metrics_handle = start_metrics_server();

    let registry = EtcdRegistry::connect(&config)
        .await
        .context("connecting to etcd")?;
    info!(etcd_host = %config.etcd_host, etcd_port = config.etcd_port, "connected to etcd");

    let events = DockerEventSource::connect().context("connecting to the Docker daemon")?;
    info!("connected to Docker");

    let sync = Arc::new(SyncLoop::new(config, Arc::new(registry), Arc::new(events)));
    let shutdown = CancellationToken::new();

    let run_shutdown = shutdown.clone();
    let mut run_handle = tokio::spawn(async move { sync.run(run_shutdown).await });

    // Whichever branch fires first, we always fall through to awaiting
    // `run_handle` below so shutdown does not return until the sync
    // loop — and every lease its `LockGuard`s hold — has actually wound
    // down; a signal branch only requests cancellation, it never exits
    // the process on its own.
    let mut exited_on_its_own = false;
    tokio::select! {
        result = &mut run_handle => {
            exited_on_its_own = true;
            info!("sync loop exited on its own");
            result.context("sync loop task panicked")??;
        }
        result = tokio::signal::ctrl_c() => {
            info!("received SIGINT, initiating graceful shutdown");
            result.context("listening for SIGINT")?;
            shutdown.cancel();
        }
        result = wait_for_sigterm() => {
            info!("received SIGTERM, initiating graceful shutdown");
            result?;
            shutdown.cancel();
        }
    }

    if !exited_on_its_own {
        run_handle.await.context("sync loop task panicked")??;
    }

    info!("graceful shutdown completed");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending().await
}
