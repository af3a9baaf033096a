//! Service domain model
//!
//! Represents a supervised background service as reported by the control plane.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// A supervised service
///
/// Records are always replaced wholesale; nothing mutates a field of a
/// `Service` once it has been decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Unique, stable service name
    pub name: String,

    /// Free-form status label, informational only
    #[serde(default)]
    pub status: String,

    /// Whether the service process is running
    pub running: bool,

    /// Health flag, meaningful only while `running` is true
    #[serde(default)]
    pub healthy: bool,

    /// Seconds since the service started, meaningful only while running
    #[serde(rename = "uptime", default, deserialize_with = "deserialize_uptime")]
    pub uptime_seconds: u64,

    /// Last error reported for the service
    #[serde(default)]
    pub last_error: Option<String>,

    /// Names of the services this one depends on (may name unknown services)
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
}

impl Service {
    /// Derives the tri-state view of this service.
    ///
    /// `healthy` is never trusted on its own: a stopped service is
    /// `Stopped` whatever its health flag says.
    pub fn state(&self) -> ServiceState {
        ServiceState::derive(self.running, self.healthy)
    }

    /// Uptime of a running service, `None` when stopped
    pub fn uptime(&self) -> Option<Duration> {
        self.running.then(|| Duration::from_secs(self.uptime_seconds))
    }
}

/// Tri-state view of a service derived from `running` and `healthy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Not running
    Stopped,

    /// Running but reporting unhealthy
    Warning,

    /// Running and healthy
    Healthy,
}

impl ServiceState {
    pub fn derive(running: bool, healthy: bool) -> Self {
        match (running, healthy) {
            (false, _) => ServiceState::Stopped,
            (true, false) => ServiceState::Warning,
            (true, true) => ServiceState::Healthy,
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Stopped => write!(f, "Stopped"),
            ServiceState::Warning => write!(f, "Warning"),
            ServiceState::Healthy => write!(f, "Healthy"),
        }
    }
}

/// Accepts integer or fractional uptimes; negative values clamp to zero.
pub(crate) fn deserialize_uptime<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Uptime {
        Whole(u64),
        Fractional(f64),
        Missing(Option<()>),
    }

    Ok(match Uptime::deserialize(deserializer)? {
        Uptime::Whole(secs) => secs,
        Uptime::Fractional(secs) if secs.is_finite() && secs > 0.0 => secs.floor() as u64,
        Uptime::Fractional(_) | Uptime::Missing(_) => 0,
    })
}
