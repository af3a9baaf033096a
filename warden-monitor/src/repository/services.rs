//! Services repository
//!
//! Handles communication with the control plane for service operations:
//! - Fetching health snapshots
//! - Fetching a single service
//! - Issuing start/stop/restart commands

use async_trait::async_trait;
use warden_client::{ControlPlaneClient, Result};
use warden_core::domain::command::CommandOutcome;
use warden_core::domain::health::HealthSnapshot;
use warden_core::domain::service::Service;

/// Repository trait for service operations with the control plane
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Fetches a complete health snapshot
    async fn fetch_health(&self) -> Result<HealthSnapshot>;

    /// Fetches one service; `ClientError::NotFound` when unknown
    async fn fetch_service(&self, name: &str) -> Result<Service>;

    /// Starts the named services (empty means all)
    async fn start(&self, names: Vec<String>) -> Result<CommandOutcome>;

    /// Stops the named services (empty means all)
    async fn stop(&self, names: Vec<String>, force: bool) -> Result<CommandOutcome>;

    /// Restarts one service
    async fn restart(&self, name: &str) -> Result<CommandOutcome>;
}

/// HTTP implementation of ServiceRepository
pub struct HttpServiceRepository {
    client: ControlPlaneClient,
}

impl HttpServiceRepository {
    /// Creates a new HTTP service repository
    ///
    /// # Arguments
    /// * `client` - Client bound to the control plane
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceRepository for HttpServiceRepository {
    async fn fetch_health(&self) -> Result<HealthSnapshot> {
        self.client.health().await
    }

    async fn fetch_service(&self, name: &str) -> Result<Service> {
        self.client.get_service(name).await
    }

    async fn start(&self, names: Vec<String>) -> Result<CommandOutcome> {
        self.client.start_services(names).await
    }

    async fn stop(&self, names: Vec<String>, force: bool) -> Result<CommandOutcome> {
        self.client.stop_services(names, force).await
    }

    async fn restart(&self, name: &str) -> Result<CommandOutcome> {
        self.client.restart_service(name).await
    }
}
