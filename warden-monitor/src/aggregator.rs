//! Status aggregation
//!
//! Summary counters projected from the registry on every read. Nothing here
//! is stored between calls.

use serde::Serialize;
use warden_core::domain::service::{Service, ServiceState};

use crate::registry::ServiceRegistry;

/// Fleet-wide counters for presentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    /// Running but unhealthy
    pub warning: usize,
}

impl StatusSummary {
    /// Counts a set of services
    pub fn from_services(services: &[Service]) -> Self {
        services
            .iter()
            .fold(StatusSummary::default(), |mut summary, service| {
                summary.total += 1;
                match service.state() {
                    ServiceState::Stopped => summary.stopped += 1,
                    ServiceState::Warning => {
                        summary.running += 1;
                        summary.warning += 1;
                    }
                    ServiceState::Healthy => summary.running += 1,
                }
                summary
            })
    }

    /// Counts the registry's current view
    pub fn of(registry: &ServiceRegistry) -> Self {
        Self::from_services(&registry.snapshot().services)
    }

    /// Running and healthy
    pub fn healthy(&self) -> usize {
        self.running - self.warning
    }
}
