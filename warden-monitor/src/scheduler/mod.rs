//! Scheduler layer for the monitor
//!
//! This layer owns the timer-driven background work that keeps the
//! registry fresh. It runs independently of any command the operator
//! issues.

pub mod poller;

pub use poller::{HealthPoller, PollerStatus};
