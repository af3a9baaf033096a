//! Log stream transport
//!
//! [`StreamTransport`] opens connections and [`StreamConnection`] reads and
//! writes frames on one of them. The WebSocket implementation is built on
//! tokio-tungstenite; tests plug in an in-memory transport.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use warden_core::domain::stream::ABNORMAL_CLOSURE;

/// Text frame sent as the liveness ping
pub const PING_FRAME: &str = "ping";

/// Close code reported when the peer closed without giving a status
const NO_STATUS_RECEIVED: u16 = 1005;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Connection attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Send failed: {0}")]
    Send(String),
}

/// One inbound event on a live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// The connection ended with this close code
    Closed(u16),
    /// The connection failed mid-stream
    Error(String),
}

/// Factory for log stream connections
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Opens a connection, returning once the handshake completed
    async fn connect(&self) -> Result<Box<dyn StreamConnection>, StreamError>;
}

/// A live log stream connection
#[async_trait]
pub trait StreamConnection: Send {
    /// Waits for the next inbound frame
    ///
    /// After `Closed` or `Error` the connection is finished.
    async fn recv(&mut self) -> Frame;

    /// Sends the liveness ping
    async fn ping(&mut self) -> Result<(), StreamError>;

    /// Closes the connection with the normal closure code
    async fn close(&mut self);
}

/// WebSocket transport for the control plane's log endpoint
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Creates a new WebSocket transport
    ///
    /// # Arguments
    /// * `url` - Log stream URL (e.g., "ws://localhost:8000/api/logs")
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StreamTransport for WsTransport {
    async fn connect(&self) -> Result<Box<dyn StreamConnection>, StreamError> {
        debug!("Connecting to log stream at {}", self.url);

        let (ws, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        Ok(Box::new(WsConnection { ws }))
    }
}

struct WsConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StreamConnection for WsConnection {
    async fn recv(&mut self) -> Frame {
        loop {
            let message = match self.ws.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Frame::Error(e.to_string()),
                None => return Frame::Closed(ABNORMAL_CLOSURE),
            };

            match message {
                Message::Text(text) => return Frame::Text(text),
                Message::Binary(data) => match String::from_utf8(data) {
                    Ok(text) => return Frame::Text(text),
                    Err(_) => trace!("Dropping non-UTF-8 binary frame"),
                },
                Message::Close(Some(frame)) => return Frame::Closed(u16::from(frame.code)),
                Message::Close(None) => return Frame::Closed(NO_STATUS_RECEIVED),
                // Control frames are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn ping(&mut self) -> Result<(), StreamError> {
        self.ws
            .send(Message::Text(PING_FRAME.to_string()))
            .await
            .map_err(|e| StreamError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "session closed".into(),
        };

        if let Err(e) = self.ws.close(Some(frame)).await {
            debug!("Log stream close handshake failed: {}", e);
        }
    }
}
