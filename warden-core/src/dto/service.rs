//! Service command DTOs

use serde::{Deserialize, Serialize};

/// Request to start services; an empty list means every service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartServices {
    pub services: Vec<String>,
}

/// Request to stop services; an empty list means every service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopServices {
    pub services: Vec<String>,

    /// Skip graceful shutdown on the control plane
    #[serde(default)]
    pub force: bool,
}
