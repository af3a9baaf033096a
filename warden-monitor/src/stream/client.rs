//! Log stream client
//!
//! [`LogStream`] is the handle held by the session; the connection itself is
//! owned by a background driver task. The driver feeds socket, timer and
//! command events into a [`StreamMachine`] and carries out the actions it
//! returns. Valid entries land in the ring buffer; nothing else outside the
//! stream is touched.

use serde::Serialize;
use std::collections::VecDeque;
use std::future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use warden_core::domain::log::LogEntry;
use warden_core::domain::stream::ConnectionState;

use super::machine::{ReconnectPolicy, StreamAction, StreamEvent, StreamMachine};
use super::transport::{Frame, StreamConnection, StreamError, StreamTransport};
use crate::config::MonitorConfig;
use crate::service::{LogBuffer, LogBufferReader};

/// Tuning for a log stream
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub keepalive_interval: Duration,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub log_capacity: usize,
}

impl From<&MonitorConfig> for StreamConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            keepalive_interval: config.keepalive_interval,
            connect_timeout: config.connect_timeout,
            reconnect: config.reconnect,
            log_capacity: config.log_capacity,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

/// Externally visible state of the log stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub state: ConnectionState,
    /// Reconnect attempts since the last successful handshake
    pub attempt: u32,
    /// Why the stream is reconnecting or failed
    pub last_error: Option<String>,
}

enum Command {
    Open,
    Close,
}

/// Handle to a live log stream
///
/// Dropping the handle closes the stream.
pub struct LogStream {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<StreamStatus>,
    buffer: LogBufferReader,
    task: Option<JoinHandle<()>>,
}

impl LogStream {
    /// Spawns the stream driver in the `Disconnected` state
    ///
    /// Must be called from within a tokio runtime. Nothing connects until
    /// [`LogStream::open`] is called.
    pub fn spawn(transport: Arc<dyn StreamTransport>, config: StreamConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StreamStatus::default());
        let buffer = LogBuffer::new(config.log_capacity);
        let reader = buffer.reader();

        let driver = Driver {
            machine: StreamMachine::new(config.reconnect),
            transport,
            config,
            connection: None,
            keepalive: None,
            reconnect_at: None,
            buffer,
            status: status_tx,
            commands: commands_rx,
            closing: false,
        };

        Self {
            commands: commands_tx,
            status: status_rx,
            buffer: reader,
            task: Some(tokio::spawn(driver.run())),
        }
    }

    /// Requests a connection
    ///
    /// Only takes effect while `Disconnected`; a `Failed` stream stays failed.
    pub fn open(&self) {
        if self.commands.send(Command::Open).is_err() {
            debug!("Log stream already shut down, ignoring open");
        }
    }

    /// Closes the stream and waits for the driver to finish
    ///
    /// Cancels the keepalive and any pending reconnect, and closes a live
    /// connection with the normal closure code. Safe to call repeatedly.
    pub async fn close(&mut self) {
        let _ = self.commands.send(Command::Close);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Log stream task ended abnormally: {}", e);
            }
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamStatus> {
        self.status.clone()
    }

    /// Buffered entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer.entries()
    }

    pub fn buffer(&self) -> LogBufferReader {
        self.buffer.clone()
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        // The driver closes the connection on its own once it sees this
        let _ = self.commands.send(Command::Close);
    }
}

struct Driver {
    machine: StreamMachine,
    transport: Arc<dyn StreamTransport>,
    config: StreamConfig,
    connection: Option<Box<dyn StreamConnection>>,
    keepalive: Option<Interval>,
    reconnect_at: Option<Instant>,
    buffer: LogBuffer,
    status: watch::Sender<StreamStatus>,
    commands: mpsc::UnboundedReceiver<Command>,
    closing: bool,
}

impl Driver {
    async fn run(mut self) {
        debug!("Log stream driver started");

        while !self.closing {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Open) => self.dispatch(StreamEvent::OpenRequested).await,
                    Some(Command::Close) | None => {
                        self.closing = true;
                        self.dispatch(StreamEvent::CloseRequested).await;
                    }
                },
                frame = next_frame(&mut self.connection) => self.on_frame(frame).await,
                _ = sleep_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.dispatch(StreamEvent::ReconnectTimerFired).await;
                }
                _ = tick(&mut self.keepalive) => self.dispatch(StreamEvent::KeepaliveTick).await,
            }
        }

        debug!("Log stream driver stopped");
    }

    /// Runs an event and everything it triggers through the machine
    async fn dispatch(&mut self, event: StreamEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            trace!("Log stream event: {:?}", event);
            let actions = self.machine.handle(event);
            self.publish();

            for action in actions {
                if let Some(next) = self.perform(action).await {
                    pending.push_back(next);
                }
            }

            // A connection only outlives these states while being closed
            if matches!(
                self.machine.state(),
                ConnectionState::Disconnected | ConnectionState::Reconnecting | ConnectionState::Failed
            ) {
                self.connection = None;
            }
        }
    }

    async fn perform(&mut self, action: StreamAction) -> Option<StreamEvent> {
        match action {
            StreamAction::Connect => return Some(self.connect().await),
            StreamAction::StartKeepalive => {
                let period = self.config.keepalive_interval;
                let mut interval = time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.keepalive = Some(interval);
            }
            StreamAction::StopKeepalive => self.keepalive = None,
            StreamAction::SendPing => {
                if let Some(connection) = self.connection.as_mut() {
                    trace!("Sending log stream keepalive");
                    let limit = self.config.connect_timeout;
                    match time::timeout(limit, connection.ping()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return Some(StreamEvent::ConnectionError(e.to_string())),
                        Err(_) => {
                            let e = StreamError::Send(format!("keepalive timed out after {:?}", limit));
                            return Some(StreamEvent::ConnectionError(e.to_string()));
                        }
                    }
                }
            }
            StreamAction::ScheduleReconnect(delay) => {
                warn!(
                    "Log stream lost ({}), reconnecting in {:?}",
                    self.machine.last_error().unwrap_or("unknown error"),
                    delay
                );
                self.reconnect_at = Some(Instant::now() + delay);
            }
            StreamAction::CancelReconnect => self.reconnect_at = None,
            StreamAction::CloseConnection => {
                if let Some(mut connection) = self.connection.take() {
                    let limit = self.config.connect_timeout;
                    if time::timeout(limit, connection.close()).await.is_err() {
                        debug!("Log stream close timed out after {:?}, dropping connection", limit);
                    }
                }
            }
        }

        None
    }

    /// Attempts one connection, bounded by the connect timeout
    ///
    /// A close request that arrives meanwhile abandons the attempt.
    async fn connect(&mut self) -> StreamEvent {
        let transport = Arc::clone(&self.transport);
        let limit = self.config.connect_timeout;
        let attempt = time::timeout(limit, transport.connect());
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                result = &mut attempt => {
                    return match result {
                        Ok(Ok(connection)) => {
                            self.connection = Some(connection);
                            StreamEvent::Handshake
                        }
                        Ok(Err(e)) => StreamEvent::ConnectionError(e.to_string()),
                        Err(_) => StreamEvent::ConnectionError(StreamError::Timeout(limit).to_string()),
                    };
                }
                command = self.commands.recv() => match command {
                    Some(Command::Open) => continue,
                    Some(Command::Close) | None => {
                        self.closing = true;
                        return StreamEvent::CloseRequested;
                    }
                }
            }
        }
    }

    async fn on_frame(&mut self, frame: Frame) {
        match frame {
            Frame::Text(text) => self.ingest(&text),
            Frame::Closed(code) => {
                self.connection = None;
                self.dispatch(StreamEvent::Closed { code }).await;
            }
            Frame::Error(reason) => {
                self.connection = None;
                self.dispatch(StreamEvent::ConnectionError(reason)).await;
            }
        }
    }

    /// Malformed frames are dropped without touching the connection
    fn ingest(&self, text: &str) {
        match LogEntry::from_frame(text) {
            Ok(entry) => self.buffer.push(entry),
            Err(_) if text.trim() == "pong" => trace!("Keepalive acknowledged"),
            Err(e) => warn!("Dropping malformed log frame: {}", e),
        }
    }

    fn publish(&self) {
        let next = StreamStatus {
            state: self.machine.state(),
            attempt: self.machine.attempt(),
            last_error: self.machine.last_error().map(str::to_string),
        };

        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }

            if current.state != next.state {
                match next.state {
                    ConnectionState::Connected => info!("Log stream connected"),
                    ConnectionState::Failed => error!(
                        "Log stream failed: {}",
                        next.last_error.as_deref().unwrap_or("unknown error")
                    ),
                    state => debug!("Log stream {} -> {}", current.state, state),
                }
            }

            *current = next;
            true
        });
    }
}

async fn next_frame(connection: &mut Option<Box<dyn StreamConnection>>) -> Frame {
    match connection {
        Some(connection) => connection.recv().await,
        None => future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}
