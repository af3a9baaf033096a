//! Warden Monitor
//!
//! Headless monitoring session: keeps polling fleet health and tails the
//! live log stream until interrupted, logging what it observes.

use anyhow::{Context, Result};
use tokio::time::{self, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_core::domain::service::ServiceState;
use warden_monitor::{MonitorConfig, MonitorSession};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden_monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Warden Monitor");

    let config = load_config()?;
    info!(
        "Loaded configuration: base_url={}, stream_url={}",
        config.base_url, config.stream_url
    );
    info!(
        "Poll interval: {:?}, keepalive interval: {:?}",
        config.poll_interval, config.keepalive_interval
    );

    let mut session =
        MonitorSession::start(&config).context("Failed to start monitor session")?;

    tokio::select! {
        _ = wait_for_shutdown_signal() => info!("Shutdown signal received"),
        _ = report(&session) => {}
    }

    session.shutdown().await;
    info!("Warden Monitor stopped");

    Ok(())
}

/// Loads configuration from environment variables
fn load_config() -> Result<MonitorConfig> {
    let config = MonitorConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Logs registry changes, stream state and new log entries as they arrive
async fn report(session: &MonitorSession) {
    let mut registry = session.registry().subscribe();
    let mut stream = session.stream().subscribe();
    let logs = session.stream().buffer();
    let mut seen_logs = 0u64;
    let mut ticker = time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            changed = registry.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = registry.borrow_and_update().clone();
                let summary = session.summary();
                info!(
                    "Fleet {}: {} total, {} running, {} stopped, {} warning",
                    snapshot.status.as_deref().unwrap_or("unknown"),
                    summary.total, summary.running, summary.stopped, summary.warning
                );
                for service in snapshot.services.iter() {
                    match service.state() {
                        ServiceState::Healthy => {}
                        ServiceState::Warning => warn!("{} is running but unhealthy", service.name),
                        ServiceState::Stopped => info!("{} is stopped", service.name),
                    }
                }
            }
            changed = stream.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = stream.borrow_and_update().clone();
                if status.state.is_failed() {
                    error!(
                        "Log stream gave up: {}",
                        status.last_error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            _ = ticker.tick() => {
                let (seen, fresh) = logs.entries_since(seen_logs);
                for entry in fresh {
                    info!(target: "warden_monitor::logs", "[{}] {}", entry.level, entry.message);
                }
                seen_logs = seen;
            }
        }
    }
}

/// Waits for Ctrl-C or SIGTERM
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
