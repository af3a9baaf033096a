//! Warden Core
//!
//! Core types shared by the Warden control-plane client, monitor and CLI.
//!
//! This crate contains:
//! - Domain types: services, health snapshots, command outcomes, log entries
//!   and log stream connection states
//! - DTOs: request bodies sent to the control plane

pub mod domain;
pub mod dto;
