//! Monitor configuration
//!
//! Defines all configurable parameters for a monitoring session including
//! the control plane endpoints, polling cadence and the log stream's
//! keepalive and reconnect policy.

use std::time::Duration;

use crate::stream::ReconnectPolicy;

/// Default control plane URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Path of the live log stream endpoint
pub const LOG_STREAM_PATH: &str = "/api/logs";

/// Monitor configuration
///
/// All timeouts and intervals are configurable to allow tuning
/// for different deployment scenarios (dev vs prod, fast vs slow networks).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Control plane base URL (e.g., "http://localhost:8000")
    pub base_url: String,

    /// Live log stream URL (e.g., "ws://localhost:8000/api/logs")
    pub stream_url: String,

    /// How often to fetch a health snapshot
    pub poll_interval: Duration,

    /// Consecutive poll failures tolerated before the registry is reported stale
    pub stale_after_failures: u32,

    /// Upper bound on every request/response call
    pub request_timeout: Duration,

    /// How often to ping the log stream while connected
    pub keepalive_interval: Duration,

    /// Upper bound on a single log stream connection attempt
    pub connect_timeout: Duration,

    /// Backoff and attempt budget for log stream reconnects
    pub reconnect: ReconnectPolicy,

    /// Number of log entries kept in memory
    pub log_capacity: usize,
}

impl MonitorConfig {
    /// Creates a new configuration with defaults
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let stream_url = stream_url_for(&base_url);

        Self {
            base_url,
            stream_url,
            poll_interval: Duration::from_secs(10),
            stale_after_failures: 3,
            request_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            log_capacity: 100,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - WARDEN_URL (optional, default: http://localhost:8000)
    /// - WARDEN_STREAM_URL (optional, derived from WARDEN_URL)
    /// - WARDEN_POLL_INTERVAL (optional, seconds, default: 10)
    /// - WARDEN_STALE_AFTER (optional, failures, default: 3)
    /// - WARDEN_REQUEST_TIMEOUT (optional, seconds, default: 10)
    /// - WARDEN_KEEPALIVE_INTERVAL (optional, seconds, default: 30)
    /// - WARDEN_RECONNECT_ATTEMPTS (optional, default: 5)
    /// - WARDEN_LOG_CAPACITY (optional, default: 100)
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("WARDEN_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Ok(stream_url) = std::env::var("WARDEN_STREAM_URL") {
            config.stream_url = stream_url;
        }

        if let Some(secs) = env_parse::<u64>("WARDEN_POLL_INTERVAL")? {
            config.poll_interval = Duration::from_secs(secs);
        }

        if let Some(failures) = env_parse::<u32>("WARDEN_STALE_AFTER")? {
            config.stale_after_failures = failures;
        }

        if let Some(secs) = env_parse::<u64>("WARDEN_REQUEST_TIMEOUT")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("WARDEN_KEEPALIVE_INTERVAL")? {
            config.keepalive_interval = Duration::from_secs(secs);
        }

        if let Some(attempts) = env_parse::<u32>("WARDEN_RECONNECT_ATTEMPTS")? {
            config.reconnect.max_attempts = attempts;
        }

        if let Some(capacity) = env_parse::<usize>("WARDEN_LOG_CAPACITY")? {
            config.log_capacity = capacity;
        }

        Ok(config)
    }

    /// Overrides the log stream URL
    pub fn with_stream_url(mut self, stream_url: impl Into<String>) -> Self {
        self.stream_url = stream_url.into();
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must start with http:// or https://");
        }

        if !self.stream_url.starts_with("ws://") && !self.stream_url.starts_with("wss://") {
            anyhow::bail!("stream_url must start with ws:// or wss://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.keepalive_interval.is_zero() {
            anyhow::bail!("keepalive_interval must be greater than 0");
        }

        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            anyhow::bail!("timeouts must be greater than 0");
        }

        if self.reconnect.base.is_zero() || self.reconnect.max < self.reconnect.base {
            anyhow::bail!("reconnect delays must satisfy 0 < base <= max");
        }

        if self.log_capacity == 0 {
            anyhow::bail!("log_capacity must be greater than 0");
        }

        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Derives the log stream URL from the control plane base URL
///
/// `http` maps to `ws` and `https` to `wss`; the path is always
/// [`LOG_STREAM_PATH`].
pub fn stream_url_for(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');

    let authority = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("ws://{}", base_url)
    };

    format!("{}{}", authority, LOG_STREAM_PATH)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
        assert_eq!(config.stale_after_failures, 3);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.log_capacity, 100);
        assert_eq!(config.stream_url, "ws://localhost:8000/api/logs");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stream_url_derivation() {
        assert_eq!(
            stream_url_for("https://ops.example.com/"),
            "wss://ops.example.com/api/logs"
        );
        assert_eq!(stream_url_for("http://10.0.0.5:8000"), "ws://10.0.0.5:8000/api/logs");
    }

    #[test]
    fn test_config_validation() {
        let mut config = MonitorConfig::default();

        config.base_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());
        config.base_url = DEFAULT_BASE_URL.to_string();

        config.stream_url = "http://localhost:8000/api/logs".to_string();
        assert!(config.validate().is_err());
        config.stream_url = stream_url_for(DEFAULT_BASE_URL);

        config.log_capacity = 0;
        assert!(config.validate().is_err());
        config.log_capacity = 100;

        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.poll_interval = Duration::from_secs(10);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_stream_url() {
        let config = MonitorConfig::new("http://ops:8000").with_stream_url("ws://logs:9000/tail");
        assert_eq!(config.base_url, "http://ops:8000");
        assert_eq!(config.stream_url, "ws://logs:9000/tail");
    }
}
