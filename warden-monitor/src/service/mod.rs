//! Service layer
//!
//! Services hold the monitor's business logic on top of the repositories:
//! issuing lifecycle commands and buffering live log entries.

mod controller;
mod log_buffer;

pub use controller::LifecycleController;
pub use log_buffer::{LogBuffer, LogBufferReader};
