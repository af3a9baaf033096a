//! In-memory control plane and log stream transport used by unit tests

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use warden_client::{ClientError, Result};
use warden_core::domain::command::{CommandOutcome, CommandStatus};
use warden_core::domain::health::{HealthSnapshot, ServiceHealth};
use warden_core::domain::service::Service;

use crate::repository::ServiceRepository;
use crate::stream::{Frame, StreamConnection, StreamError, StreamTransport};
use warden_core::domain::stream::ABNORMAL_CLOSURE;

/// A fleet that reacts to lifecycle commands like a real control plane
#[derive(Default)]
pub(crate) struct FakeControlPlane {
    fleet: Mutex<BTreeMap<String, ServiceHealth>>,
    /// Number of upcoming health requests that fail
    pub failing_polls: AtomicU32,
    pub health_calls: AtomicUsize,
    /// Replaces the computed outcome of the next command
    pub scripted_outcome: Mutex<Option<CommandOutcome>>,
    pub commands: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    pub fn with_fleet(services: &[(&str, bool, bool)]) -> Self {
        let fake = Self::default();
        {
            let mut fleet = fake.fleet.lock().unwrap();
            for &(name, running, healthy) in services {
                fleet.insert(name.to_string(), health(running, healthy));
            }
        }
        fake
    }

    pub fn fail_next_polls(&self, count: u32) {
        self.failing_polls.store(count, Ordering::SeqCst);
    }

    pub fn script_outcome(&self, outcome: CommandOutcome) {
        *self.scripted_outcome.lock().unwrap() = Some(outcome);
    }

    fn snapshot(&self) -> HealthSnapshot {
        let fleet = self.fleet.lock().unwrap();
        let all_healthy = fleet.values().all(|s| s.running && s.healthy);

        HealthSnapshot {
            status: if all_healthy { "ok" } else { "warning" }.to_string(),
            all_healthy,
            services: fleet.clone(),
        }
    }

    fn command(&self, verb: &str, names: Vec<String>, running: bool, done: &str) -> CommandOutcome {
        self.commands
            .lock()
            .unwrap()
            .push(format!("{} {}", verb, names.join(",")));

        if let Some(outcome) = self.scripted_outcome.lock().unwrap().take() {
            return outcome;
        }

        let mut fleet = self.fleet.lock().unwrap();
        let targets: Vec<String> = if names.is_empty() {
            fleet.keys().cloned().collect()
        } else {
            names
        };

        let mut details = BTreeMap::new();
        for name in targets {
            match fleet.get_mut(&name) {
                Some(service) => {
                    service.running = running;
                    service.healthy = running;
                    service.status = done.to_string();
                    details.insert(name, done.to_string());
                }
                None => {
                    details.insert(name, "error: unknown service".to_string());
                }
            }
        }

        let status = if details.values().any(|d| d.starts_with("error")) {
            CommandStatus::Partial
        } else {
            CommandStatus::Success
        };

        CommandOutcome {
            status,
            message: format!("{} finished", verb),
            details,
        }
    }
}

pub(crate) fn health(running: bool, healthy: bool) -> ServiceHealth {
    ServiceHealth {
        status: if running { "running" } else { "stopped" }.to_string(),
        running,
        healthy,
        uptime_seconds: if running { 120 } else { 0 },
        last_error: None,
        depends_on: BTreeSet::new(),
    }
}

#[async_trait]
impl ServiceRepository for FakeControlPlane {
    async fn fetch_health(&self) -> Result<HealthSnapshot> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_polls.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_polls.store(failing - 1, Ordering::SeqCst);
            return Err(ClientError::api_error(503, "control plane unavailable"));
        }

        Ok(self.snapshot())
    }

    async fn fetch_service(&self, name: &str) -> Result<Service> {
        let snapshot = self.snapshot();
        snapshot
            .to_services()
            .into_iter()
            .find(|service| service.name == name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))
    }

    async fn start(&self, names: Vec<String>) -> Result<CommandOutcome> {
        Ok(self.command("start", names, true, "started"))
    }

    async fn stop(&self, names: Vec<String>, _force: bool) -> Result<CommandOutcome> {
        Ok(self.command("stop", names, false, "stopped"))
    }

    async fn restart(&self, name: &str) -> Result<CommandOutcome> {
        Ok(self.command("restart", vec![name.to_string()], true, "restarted"))
    }
}

/// How the fake transport answers connection attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransportMode {
    Accept,
    Refuse,
    /// Never completes the handshake
    Hang,
    /// Accepts, but pings and closes never finish sending
    Stall,
}

/// What the client sent on a fake connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sent {
    Ping,
    Close,
}

/// Server side of one accepted fake connection
pub(crate) struct Peer {
    pub frames: mpsc::UnboundedSender<Frame>,
    pub sent: mpsc::UnboundedReceiver<Sent>,
}

pub(crate) struct FakeTransport {
    pub mode: Mutex<TransportMode>,
    pub connects: AtomicUsize,
    peers: mpsc::UnboundedSender<Peer>,
}

impl FakeTransport {
    /// Returns the transport and the stream of accepted peers
    pub fn new(mode: TransportMode) -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            mode: Mutex::new(mode),
            connects: AtomicUsize::new(0),
            peers: peers_tx,
        });
        (transport, peers_rx)
    }
}

#[async_trait]
impl StreamTransport for FakeTransport {
    async fn connect(&self) -> std::result::Result<Box<dyn StreamConnection>, StreamError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let mode = *self.mode.lock().unwrap();
        match mode {
            TransportMode::Refuse => Err(StreamError::Connect("connection refused".to_string())),
            TransportMode::Hang => std::future::pending().await,
            TransportMode::Accept | TransportMode::Stall => {
                let (frames_tx, frames_rx) = mpsc::unbounded_channel();
                let (sent_tx, sent_rx) = mpsc::unbounded_channel();
                let _ = self.peers.send(Peer {
                    frames: frames_tx,
                    sent: sent_rx,
                });
                Ok(Box::new(FakeConnection {
                    frames: frames_rx,
                    sent: sent_tx,
                    stall: mode == TransportMode::Stall,
                }))
            }
        }
    }
}

struct FakeConnection {
    frames: mpsc::UnboundedReceiver<Frame>,
    sent: mpsc::UnboundedSender<Sent>,
    stall: bool,
}

#[async_trait]
impl StreamConnection for FakeConnection {
    async fn recv(&mut self) -> Frame {
        self.frames
            .recv()
            .await
            .unwrap_or(Frame::Closed(ABNORMAL_CLOSURE))
    }

    async fn ping(&mut self) -> std::result::Result<(), StreamError> {
        self.sent
            .send(Sent::Ping)
            .map_err(|_| StreamError::Send("peer gone".to_string()))?;
        if self.stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.sent.send(Sent::Close);
        if self.stall {
            std::future::pending::<()>().await;
        }
    }
}
