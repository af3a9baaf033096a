//! Warden HTTP Client
//!
//! A simple, type-safe HTTP client for the control plane that supervises the
//! service fleet.
//!
//! This crate provides a unified interface for both the monitor and the CLI to
//! read service state and issue lifecycle commands.
//!
//! # Example
//!
//! ```no_run
//! use warden_client::ControlPlaneClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ControlPlaneClient::new("http://localhost:8000");
//!
//!     let snapshot = client.health().await?;
//!     println!("{} service(s), all healthy: {}", snapshot.services.len(), snapshot.all_healthy);
//!     Ok(())
//! }
//! ```

pub mod error;
mod services;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use services::validate_service_name;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Path prefix of the control plane's request/response API
pub const API_PREFIX: &str = "/api/v1";

/// HTTP client for the control plane API
///
/// This client provides methods for every request/response endpoint:
/// - Service queries (list, get)
/// - Lifecycle commands (start, stop, restart)
/// - Health snapshots
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    /// Base URL of the control plane (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ControlPlaneClient {
    /// Create a new control plane client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the control plane (e.g., "http://localhost:8000")
    ///
    /// # Example
    /// ```
    /// use warden_client::ControlPlaneClient;
    ///
    /// let client = ControlPlaneClient::new("http://localhost:8000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the control plane
    /// * `client` - A configured reqwest Client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a new client whose every request is bounded by `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Get the base URL of the control plane
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
