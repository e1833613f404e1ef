// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `attend serve` command implementation.
//!
//! Opens SQLite storage, installs the Prometheus recorder when enabled, and
//! runs the HTTP gateway until SIGINT/SIGTERM. Storage is closed after the
//! gateway has drained.

use std::sync::Arc;
use std::time::{Duration, Instant};

use attend_config::AttendConfig;
use attend_core::{AttendError, StorageAdapter};
use attend_dispatch::Dispatcher;
use attend_gateway::{GatewayState, HealthState, ServerConfig, start_server};
use attend_prometheus::PrometheusAdapter;
use attend_storage::SqliteStorage;
use tracing::{error, info, warn};

use crate::shutdown;

/// Runs the `attend serve` command.
pub async fn run_serve(config: AttendConfig) -> Result<(), AttendError> {
    init_tracing(&config.server.log_level);

    info!("starting attend serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
        if config.metrics.enabled {
            let adapter = Arc::new(PrometheusAdapter::new()?);
            Some(Arc::new(move || adapter.render()))
        } else {
            info!("metrics disabled");
            None
        };

    let dispatcher = Arc::new(Dispatcher::new(storage.clone(), &config.dispatch));
    let depth = dispatcher.manager().snapshot().await?.len();
    attend_prometheus::set_queue_depth(depth);
    info!(queue_depth = depth, "command queue loaded");

    if config.gateway.bearer_token.is_none() {
        warn!("no gateway.bearer_token configured, operator API rejects every request");
    }

    let cancel = shutdown::install_signal_handler();

    {
        let mem_cancel = cancel.clone();
        tokio::spawn(async move {
            memory_monitor(mem_cancel).await;
        });
    }

    let state = GatewayState {
        dispatcher,
        health: HealthState {
            start_time: Instant::now(),
            prometheus_render,
            storage: storage.clone(),
        },
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };

    let served = shutdown::drain_with_timeout(
        start_server(&server_config, state, cancel.clone()),
        &cancel,
        Duration::from_secs(config.server.shutdown_timeout_secs),
    )
    .await;
    // Stops the memory monitor when the server exits on its own.
    cancel.cancel();

    if let Err(e) = storage.close().await {
        error!(error = %e, "failed to close storage cleanly");
    }

    match served {
        Some(result) => result?,
        None => warn!("gateway did not drain before the shutdown timeout"),
    }

    info!("attend stopped");
    Ok(())
}

/// Exports jemalloc and RSS memory gauges every 5 seconds.
#[cfg(not(target_env = "msvc"))]
async fn memory_monitor(cancel: tokio_util::sync::CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Stats are cached until the epoch advances.
                let _ = tikv_jemalloc_ctl::epoch::advance();
                let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
                let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
                let rss = read_rss_bytes().unwrap_or(0);

                attend_prometheus::set_memory_heap(allocated as f64);
                attend_prometheus::set_memory_resident(resident as f64);
                attend_prometheus::set_memory_rss(rss as f64);
            }
            _ = cancel.cancelled() => {
                info!("memory monitor shutting down");
                break;
            }
        }
    }
}

#[cfg(target_env = "msvc")]
async fn memory_monitor(cancel: tokio_util::sync::CancellationToken) {
    let _ = read_rss_bytes();
    cancel.cancelled().await;
}

/// Process RSS in bytes from /proc/self/statm. `None` off Linux.
fn read_rss_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let rss_pages = statm.split_whitespace().nth(1)?.parse::<u64>().ok()?;
        Some(rss_pages * 4096)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// `RUST_LOG` wins; otherwise `attend*` crates log at `log_level` and
/// dependencies at `warn`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("attend={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn rss_is_readable_on_linux() {
        assert!(read_rss_bytes().unwrap() > 0);
    }

    #[tokio::test]
    async fn memory_monitor_stops_on_cancel() {
        let cancel = tokio_util::sync::CancellationToken::new();
        let handle = tokio::spawn(memory_monitor(cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
