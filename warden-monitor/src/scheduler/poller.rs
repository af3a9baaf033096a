//! Health poller
//!
//! Periodically fetches a full health snapshot from the control plane and
//! applies it to the registry. A failed poll leaves the registry untouched
//! and bumps a consecutive-failure counter; past the retry budget the view is
//! flagged stale, but polling carries on until the session is torn down.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use warden_client::{ClientError, Result};
use warden_core::domain::health::HealthSnapshot;

use crate::registry::ServiceRegistry;
use crate::repository::ServiceRepository;

/// Freshness of the registry as seen by the poller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollerStatus {
    /// Polls failed in a row since the last success
    pub consecutive_failures: u32,

    /// The registry may be out of date (retry budget exceeded)
    pub stale: bool,

    /// When the last poll succeeded
    pub last_success: Option<DateTime<Utc>>,

    /// Error of the most recent failed poll
    pub last_error: Option<String>,
}

/// Health poller that keeps the registry in step with the control plane
pub struct HealthPoller {
    repository: Arc<dyn ServiceRepository>,
    registry: Arc<ServiceRegistry>,
    interval: Duration,
    stale_after_failures: u32,
    status: watch::Sender<PollerStatus>,
}

impl HealthPoller {
    /// Creates a new health poller
    ///
    /// # Arguments
    /// * `repository` - Source of health snapshots
    /// * `registry` - Registry replaced on every successful poll
    /// * `interval` - Time between scheduled polls
    /// * `stale_after_failures` - Failures tolerated before the view is stale
    pub fn new(
        repository: Arc<dyn ServiceRepository>,
        registry: Arc<ServiceRegistry>,
        interval: Duration,
        stale_after_failures: u32,
    ) -> Self {
        Self {
            repository,
            registry,
            interval,
            stale_after_failures,
            status: watch::Sender::new(PollerStatus::default()),
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn status(&self) -> PollerStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerStatus> {
        self.status.subscribe()
    }

    /// Performs a single poll
    ///
    /// On success the registry is replaced, unless a newer write landed
    /// while this request was in flight.
    pub async fn poll(&self) -> Result<HealthSnapshot> {
        let sequence = self.registry.next_sequence();

        match self.repository.fetch_health().await {
            Ok(snapshot) => {
                if self.registry.apply_snapshot(sequence, &snapshot) {
                    debug!(
                        "Applied health snapshot #{} ({} service(s))",
                        sequence,
                        snapshot.services.len()
                    );
                }
                self.record_success();
                Ok(snapshot)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// On-demand poll used after lifecycle commands
    pub async fn refresh(&self) -> Result<HealthSnapshot> {
        self.poll().await
    }

    /// Starts the polling loop
    ///
    /// Polls immediately, then on every interval tick, until `shutdown` is
    /// cancelled. A failed poll is never retried before the next tick.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Starting health poller (interval: {:?})", self.interval);

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = async {
                    interval.tick().await;
                    // Failures are recorded in the status channel by poll()
                    let _ = self.poll().await;
                } => {}
            }
        }

        info!("Health poller stopped");
    }

    fn record_success(&self) {
        self.status.send_modify(|status| {
            if status.consecutive_failures > 0 {
                info!(
                    "Health poll recovered after {} failure(s)",
                    status.consecutive_failures
                );
            }
            *status = PollerStatus {
                consecutive_failures: 0,
                stale: false,
                last_success: Some(Utc::now()),
                last_error: None,
            };
        });
    }

    fn record_failure(&self, err: &ClientError) {
        let budget = self.stale_after_failures;

        self.status.send_modify(|status| {
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            status.last_error = Some(err.to_string());

            if status.consecutive_failures > budget {
                if !status.stale {
                    error!(
                        "Health poll failed {} times in a row, registry is stale: {}",
                        status.consecutive_failures, err
                    );
                }
                status.stale = true;
            } else {
                warn!(
                    "Health poll failed ({}/{}), keeping last known state: {}",
                    status.consecutive_failures, budget, err
                );
            }
        });
    }
}
