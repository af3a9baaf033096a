//! Live log stream
//!
//! - [`machine`]: pure connection state machine and reconnect policy
//! - [`transport`]: connection seam and its WebSocket implementation
//! - [`client`]: the async driver and the [`LogStream`] handle

pub mod client;
pub mod machine;
pub mod transport;

pub use client::{LogStream, StreamConfig, StreamStatus};
pub use machine::{ReconnectPolicy, StreamAction, StreamEvent, StreamMachine};
pub use transport::{Frame, StreamConnection, StreamError, StreamTransport, WsTransport};
