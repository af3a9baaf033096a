//! Lifecycle controller
//!
//! Issues start/stop/restart commands and reconciles their per-service
//! outcomes. Command responses are trusted only for their `details`; the
//! registry itself is refreshed through a full poll after every command.
//!
//! `depends_on` is informational here. Ordering of dependent services is the
//! control plane's job, so batches are sent as requested.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use warden_client::{Result, validate_service_name};
use warden_core::domain::command::{CommandOutcome, CommandStatus, NO_RESULT_DETAIL, is_error_detail};
use warden_core::domain::service::Service;

use crate::repository::ServiceRepository;
use crate::scheduler::HealthPoller;

/// Controller for service lifecycle commands
pub struct LifecycleController {
    repository: Arc<dyn ServiceRepository>,
    poller: Arc<HealthPoller>,
}

impl LifecycleController {
    /// Creates a new lifecycle controller
    ///
    /// # Arguments
    /// * `repository` - Control plane access
    /// * `poller` - Poller used for the post-command refresh
    pub fn new(repository: Arc<dyn ServiceRepository>, poller: Arc<HealthPoller>) -> Self {
        Self { repository, poller }
    }

    /// Starts the named services; an empty set starts every service
    pub async fn start(&self, names: &BTreeSet<String>) -> Result<CommandOutcome> {
        validate_names(names)?;
        info!("Starting {}", describe(names));

        let outcome = self.repository.start(names.iter().cloned().collect()).await?;
        self.finish(names, outcome).await
    }

    /// Stops the named services; an empty set stops every service
    ///
    /// `force` asks the control plane to skip graceful shutdown.
    pub async fn stop(&self, names: &BTreeSet<String>, force: bool) -> Result<CommandOutcome> {
        validate_names(names)?;
        info!("Stopping {} (force: {})", describe(names), force);

        let outcome = self
            .repository
            .stop(names.iter().cloned().collect(), force)
            .await?;
        self.finish(names, outcome).await
    }

    /// Restarts a single service
    pub async fn restart(&self, name: &str) -> Result<CommandOutcome> {
        validate_service_name(name)?;
        info!("Restarting service {}", name);

        let outcome = self.repository.restart(name).await?;
        let requested = BTreeSet::from([name.to_string()]);
        self.finish(&requested, outcome).await
    }

    /// Fetches one service straight from the control plane
    ///
    /// An unknown service is `Ok(None)`, not an error.
    pub async fn get(&self, name: &str) -> Result<Option<Service>> {
        match self.repository.fetch_service(name).await {
            Ok(service) => Ok(Some(service)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn finish(
        &self,
        requested: &BTreeSet<String>,
        outcome: CommandOutcome,
    ) -> Result<CommandOutcome> {
        let outcome = reconcile(requested, outcome);

        let failed = outcome.failed_services();
        if !failed.is_empty() {
            warn!(
                "Command finished with status {}, failed: {}",
                outcome.status,
                failed.join(", ")
            );
        }

        // The registry is only ever rebuilt from a full snapshot
        if let Err(e) = self.poller.refresh().await {
            warn!("Post-command refresh failed, registry may lag: {}", e);
        }

        Ok(outcome)
    }
}

/// Rejects malformed names before anything reaches the network
fn validate_names(names: &BTreeSet<String>) -> Result<()> {
    names.iter().try_for_each(|name| validate_service_name(name))
}

/// Normalises `details` to exactly one entry per requested name
///
/// Names the control plane did not report are marked as errors, unrequested
/// keys are dropped, and a `success` carrying per-service errors becomes
/// `partial`. An empty request ("all services") keeps the reported details.
pub(crate) fn reconcile(requested: &BTreeSet<String>, mut outcome: CommandOutcome) -> CommandOutcome {
    if !requested.is_empty() {
        let mut reported = std::mem::take(&mut outcome.details);
        outcome.details = requested
            .iter()
            .map(|name| {
                let detail = reported
                    .remove(name)
                    .unwrap_or_else(|| NO_RESULT_DETAIL.to_string());
                (name.clone(), detail)
            })
            .collect();
    }

    let errors = outcome
        .details
        .values()
        .filter(|detail| is_error_detail(detail))
        .count();

    if outcome.status == CommandStatus::Success && errors > 0 {
        outcome.status = CommandStatus::Partial;
    }

    outcome
}

fn describe(names: &BTreeSet<String>) -> String {
    if names.is_empty() {
        "all services".to_string()
    } else {
        names.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}
