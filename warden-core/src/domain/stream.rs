//! Log stream connection states

use serde::{Deserialize, Serialize};

/// WebSocket close code for a normal closure
pub const NORMAL_CLOSURE: u16 = 1000;

/// WebSocket close code reported when a connection drops without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Connection state of the live log stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No connection and none pending
    #[default]
    Disconnected,

    /// A connection attempt is in flight
    Connecting,

    /// Handshake complete, entries are flowing
    Connected,

    /// Waiting out the backoff delay before the next attempt
    Reconnecting,

    /// Reconnect attempts exhausted
    Failed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConnectionState::Failed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Reconnecting => write!(f, "Reconnecting"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}
