//! Data Transfer Objects for control-plane requests
//!
//! Lightweight request bodies sent to the control plane. Responses decode
//! straight into domain types.

pub mod service;
