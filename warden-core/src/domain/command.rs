//! Lifecycle command domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-service detail used when the control plane omitted a requested name
pub const NO_RESULT_DETAIL: &str = "error: no result reported";

/// Overall status of a lifecycle command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CommandStatus {
    /// Every requested service reached the requested state
    Success,

    /// Some requested services failed
    Partial,

    /// The command failed as a whole
    Failure,
}

impl From<String> for CommandStatus {
    fn from(label: String) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "success" | "ok" => CommandStatus::Success,
            "partial" => CommandStatus::Partial,
            _ => CommandStatus::Failure,
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandStatus::Success => write!(f, "success"),
            CommandStatus::Partial => write!(f, "partial"),
            CommandStatus::Failure => write!(f, "failure"),
        }
    }
}

/// Result of a start/stop/restart command
///
/// Batch commands report one `details` entry per requested service, so a
/// partial failure is never collapsed into a single flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub status: CommandStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }

    /// Names whose per-service result is an error
    pub fn failed_services(&self) -> Vec<&str> {
        self.details
            .iter()
            .filter(|(_, detail)| is_error_detail(detail))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Whether a per-service result string reports an error
pub fn is_error_detail(detail: &str) -> bool {
    detail
        .trim_start()
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("error"))
}
