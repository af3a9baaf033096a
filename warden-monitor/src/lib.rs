//! Warden Monitor
//!
//! Client-side supervisor core for a fleet of services managed by a remote
//! control plane.
//!
//! Architecture:
//! - Configuration: endpoints, polling cadence and stream tuning
//! - Repositories: HTTP communication with the control plane
//! - Registry: last-known fleet state, replaced whole on every poll
//! - Scheduler: the health poller
//! - Services: lifecycle commands and the log ring buffer
//! - Stream: the live log connection and its reconnect state machine
//! - Session: wiring and teardown for one operator session

pub mod aggregator;
pub mod config;
pub mod registry;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod stream;

#[cfg(test)]
mod testing;

pub use aggregator::StatusSummary;
pub use config::MonitorConfig;
pub use registry::{RegistrySnapshot, ServiceRegistry};
pub use session::MonitorSession;
