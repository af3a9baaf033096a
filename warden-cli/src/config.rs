//! Configuration module
//!
//! Handles CLI configuration: where the control plane and its log stream live.

use anyhow::Result;
use warden_monitor::MonitorConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the control plane
    pub base_url: String,

    /// URL of the live log stream, derived from `base_url` when unset
    pub stream_url: Option<String>,
}

impl Config {
    /// Builds the monitor configuration used by session-backed commands
    pub fn monitor(&self) -> Result<MonitorConfig> {
        let mut config = MonitorConfig::new(&self.base_url);
        if let Some(stream_url) = &self.stream_url {
            config = config.with_stream_url(stream_url);
        }

        config.validate()?;
        Ok(config)
    }
}
