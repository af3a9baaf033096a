//! Health snapshot domain types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::service::{Service, deserialize_uptime};

/// Per-service attributes inside a health snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    #[serde(default)]
    pub status: String,
    pub running: bool,
    #[serde(default)]
    pub healthy: bool,
    #[serde(rename = "uptime", default, deserialize_with = "deserialize_uptime")]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
}

/// A complete, atomic view of every service's health
///
/// A snapshot is never merged into an earlier one: it replaces the whole
/// observed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Overall status label reported by the control plane
    #[serde(default)]
    pub status: String,

    /// Overall health flag reported by the control plane
    #[serde(default)]
    pub all_healthy: bool,

    /// Health attributes keyed by service name
    #[serde(default)]
    pub services: BTreeMap<String, ServiceHealth>,
}

impl HealthSnapshot {
    /// Builds one whole `Service` record per snapshot entry, ordered by name
    pub fn to_services(&self) -> Vec<Service> {
        self.services
            .iter()
            .map(|(name, health)| Service {
                name: name.clone(),
                status: health.status.clone(),
                running: health.running,
                healthy: health.healthy,
                uptime_seconds: health.uptime_seconds,
                last_error: health.last_error.clone(),
                depends_on: health.depends_on.clone(),
            })
            .collect()
    }
}
