//! Service-related API endpoints

use crate::ControlPlaneClient;
use crate::error::{ClientError, Result};
use tracing::debug;
use warden_core::domain::command::CommandOutcome;
use warden_core::domain::health::HealthSnapshot;
use warden_core::domain::service::Service;
use warden_core::dto::service::{StartServices, StopServices};

/// Rejects names that cannot be a service name or a URL path segment
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ClientError::InvalidRequest(
            "service name cannot be empty".to_string(),
        ));
    }

    if name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(ClientError::InvalidRequest(format!(
            "invalid service name '{}'",
            name
        )));
    }

    Ok(())
}

impl ControlPlaneClient {
    // =============================================================================
    // Service Query
    // =============================================================================

    /// List all services
    ///
    /// # Returns
    /// Every service known to the control plane
    pub async fn list_services(&self) -> Result<Vec<Service>> {
        let url = self.url("/services");
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a single service
    ///
    /// # Arguments
    /// * `name` - The service name
    ///
    /// # Returns
    /// The service, or `ClientError::NotFound` when the control plane does not know it
    pub async fn get_service(&self, name: &str) -> Result<Service> {
        validate_service_name(name)?;

        let url = self.url(&format!("/services/{}", name));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::NotFound(name.to_string())
            } else {
                e
            }
        })
    }

    /// Fetch a complete health snapshot
    pub async fn health(&self) -> Result<HealthSnapshot> {
        let url = self.url("/services/health");
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Lifecycle Commands
    // =============================================================================

    /// Start services
    ///
    /// # Arguments
    /// * `services` - Names to start; empty means every service
    ///
    /// # Example
    /// ```no_run
    /// # use warden_client::ControlPlaneClient;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = ControlPlaneClient::new("http://localhost:8000");
    /// let outcome = client.start_services(vec!["database".to_string()]).await?;
    /// println!("{}: {:?}", outcome.status, outcome.details);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start_services(&self, services: Vec<String>) -> Result<CommandOutcome> {
        debug!("Starting services: {:?}", services);

        let url = self.url("/services/start");
        let response = self
            .client
            .post(&url)
            .json(&StartServices { services })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Stop services
    ///
    /// # Arguments
    /// * `services` - Names to stop; empty means every service
    /// * `force` - Skip graceful shutdown
    pub async fn stop_services(&self, services: Vec<String>, force: bool) -> Result<CommandOutcome> {
        debug!("Stopping services: {:?} (force: {})", services, force);

        let url = self.url("/services/stop");
        let response = self
            .client
            .post(&url)
            .json(&StopServices { services, force })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Restart a single service
    ///
    /// # Arguments
    /// * `name` - The service to restart
    pub async fn restart_service(&self, name: &str) -> Result<CommandOutcome> {
        validate_service_name(name)?;
        debug!("Restarting service {}", name);

        let url = self.url(&format!("/services/{}/restart", name));
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::NotFound(name.to_string())
            } else {
                e
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use warden_core::domain::command::CommandStatus;

    /// Serves exactly one canned HTTP response and hands back the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };

        let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        request.len() >= head_end + 4 + body_len
    }

    #[test]
    fn test_validate_service_name() {
        assert!(validate_service_name("telegram_client").is_ok());
        assert!(validate_service_name("").is_err());
        assert!(validate_service_name("a/b").is_err());
        assert!(validate_service_name("a b").is_err());
    }

    #[tokio::test]
    async fn test_health_snapshot_request() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"status":"ok","all_healthy":true,"services":{"db":{"status":"running","running":true,"healthy":true,"uptime":10,"last_error":null}}}"#,
        )
        .await;

        let client = ControlPlaneClient::new(url);
        let snapshot = client.health().await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("GET /api/v1/services/health "));
        assert!(snapshot.all_healthy);
        assert!(snapshot.services["db"].running);
    }

    #[tokio::test]
    async fn test_stop_sends_names_and_force() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"status":"success","message":"stopped","details":{"api":"stopped"}}"#,
        )
        .await;

        let client = ControlPlaneClient::new(url);
        let outcome = client
            .stop_services(vec!["api".to_string()], true)
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /api/v1/services/stop "));
        assert!(request.contains(r#""services":["api"]"#));
        assert!(request.contains(r#""force":true"#));
        assert_eq!(outcome.status, CommandStatus::Success);
        assert_eq!(outcome.details["api"], "stopped");
    }

    #[tokio::test]
    async fn test_get_service_not_found() {
        let (url, server) = serve_once("404 Not Found", r#"{"detail":"no such service"}"#).await;

        let client = ControlPlaneClient::new(url);
        let err = client.get_service("ghost").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, ClientError::NotFound(ref name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let (url, server) = serve_once("503 Service Unavailable", r#"{"detail":"busy"}"#).await;

        let client = ControlPlaneClient::new(url);
        let err = client.list_services().await.unwrap_err();
        server.await.unwrap();

        assert!(err.is_server_error());
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_garbled_body_is_parse_error() {
        let (url, server) = serve_once("200 OK", "not json").await;

        let client = ControlPlaneClient::new(url);
        let err = client.health().await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, ClientError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_restart_rejects_invalid_name_without_network() {
        let client = ControlPlaneClient::new("http://127.0.0.1:9");
        let err = client.restart_service("").await.unwrap_err();

        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }
}
