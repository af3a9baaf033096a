//! Monitor session
//!
//! Wires the registry, poller, controller and log stream together for one
//! operator session and owns their teardown.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warden_client::ControlPlaneClient;

use crate::aggregator::StatusSummary;
use crate::config::MonitorConfig;
use crate::registry::ServiceRegistry;
use crate::repository::{HttpServiceRepository, ServiceRepository};
use crate::scheduler::HealthPoller;
use crate::service::LifecycleController;
use crate::stream::{LogStream, StreamConfig, StreamTransport, WsTransport};

/// A running monitor: background polling plus the live log stream
pub struct MonitorSession {
    registry: Arc<ServiceRegistry>,
    poller: Arc<HealthPoller>,
    controller: LifecycleController,
    stream: LogStream,
    shutdown: CancellationToken,
    poll_task: Option<JoinHandle<()>>,
}

impl MonitorSession {
    /// Starts a session against the configured control plane
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;

        let client = ControlPlaneClient::with_timeout(&config.base_url, config.request_timeout)
            .context("Failed to create control plane client")?;
        let repository: Arc<dyn ServiceRepository> = Arc::new(HttpServiceRepository::new(client));
        let transport: Arc<dyn StreamTransport> = Arc::new(WsTransport::new(&config.stream_url));

        info!(
            "Starting monitor session: control plane {}, log stream {}",
            config.base_url, config.stream_url
        );

        Self::with_parts(config, repository, transport)
    }

    /// Starts a session over the given repository and stream transport
    ///
    /// Fails without spawning anything when the configuration is invalid.
    pub fn with_parts(
        config: &MonitorConfig,
        repository: Arc<dyn ServiceRepository>,
        transport: Arc<dyn StreamTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(ServiceRegistry::new());
        let poller = Arc::new(HealthPoller::new(
            Arc::clone(&repository),
            Arc::clone(&registry),
            config.poll_interval,
            config.stale_after_failures,
        ));
        let controller = LifecycleController::new(repository, Arc::clone(&poller));

        let shutdown = CancellationToken::new();
        let poll_task = tokio::spawn({
            let poller = Arc::clone(&poller);
            let shutdown = shutdown.clone();
            async move { poller.run(shutdown).await }
        });

        let stream = LogStream::spawn(transport, StreamConfig::from(config));
        stream.open();

        Ok(Self {
            registry,
            poller,
            controller,
            stream,
            shutdown,
            poll_task: Some(poll_task),
        })
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn poller(&self) -> &Arc<HealthPoller> {
        &self.poller
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    pub fn stream(&self) -> &LogStream {
        &self.stream
    }

    /// Counts over the current registry snapshot
    pub fn summary(&self) -> StatusSummary {
        StatusSummary::of(&self.registry)
    }

    /// Stops polling and closes the log stream
    ///
    /// Cancels the poll timer, the keepalive timer and any pending
    /// reconnect, then closes the connection normally. Idempotent.
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();

        if let Some(task) = self.poll_task.take() {
            info!("Stopping monitor session");
            if let Err(e) = task.await {
                warn!("Poll task ended abnormally: {}", e);
            }
        }

        self.stream.close().await;
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
