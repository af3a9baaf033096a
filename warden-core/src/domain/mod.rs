//! Core domain types
//!
//! This module contains the structures reported by the control plane and the
//! states derived from them. They are shared between the HTTP client (which
//! decodes them), the monitor (which holds them) and the CLI (which prints them).

pub mod command;
pub mod health;
pub mod log;
pub mod service;
pub mod stream;
