//! Log stream connection state machine
//!
//! Pure transition logic for the live log stream. The machine never touches
//! the network or the clock; it consumes [`StreamEvent`]s and answers with the
//! [`StreamAction`]s the driver must perform. At most one reconnect timer is
//! ever pending: only `Reconnecting` owns one, and every way out of that
//! state either fires it or cancels it.

use std::time::Duration;
use warden_core::domain::stream::{ConnectionState, NORMAL_CLOSURE};

/// Reconnect backoff and attempt budget
///
/// The delay before attempt `n` (0-based) is `base × 2^n`, clamped to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub max: Duration,
    /// Consecutive reconnects allowed before giving up
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            max: Duration::from_millis(30000),
            max_attempts: 5,
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The owner asked for the stream to be opened
    OpenRequested,
    /// The connection attempt completed its handshake
    Handshake,
    /// The connection closed with the given code
    Closed { code: u16 },
    /// The connection attempt or the live connection failed
    ConnectionError(String),
    ReconnectTimerFired,
    KeepaliveTick,
    /// The owner asked for the stream to be closed
    CloseRequested,
}

/// Side effects requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAction {
    Connect,
    StartKeepalive,
    StopKeepalive,
    SendPing,
    ScheduleReconnect(Duration),
    CancelReconnect,
    CloseConnection,
}

/// Connection state machine for the live log stream
#[derive(Debug, Clone)]
pub struct StreamMachine {
    state: ConnectionState,
    attempt: u32,
    policy: ReconnectPolicy,
    last_error: Option<String>,
}

impl StreamMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            policy,
            last_error: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts made since the last successful handshake
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Applies an event and returns the actions to perform, in order
    pub fn handle(&mut self, event: StreamEvent) -> Vec<StreamAction> {
        use ConnectionState::*;

        match (self.state, event) {
            (Disconnected, StreamEvent::OpenRequested) => {
                self.attempt = 0;
                self.last_error = None;
                self.state = Connecting;
                vec![StreamAction::Connect]
            }

            (Connecting, StreamEvent::Handshake) => {
                self.attempt = 0;
                self.last_error = None;
                self.state = Connected;
                vec![StreamAction::StartKeepalive]
            }
            // A handshake nobody is waiting for
            (_, StreamEvent::Handshake) => vec![StreamAction::CloseConnection],

            (Connected, StreamEvent::Closed { code }) if code == NORMAL_CLOSURE => {
                self.state = Disconnected;
                vec![StreamAction::StopKeepalive]
            }
            (Connecting, StreamEvent::Closed { code }) if code == NORMAL_CLOSURE => {
                self.state = Disconnected;
                Vec::new()
            }
            (Connected | Connecting, StreamEvent::Closed { code }) => {
                self.lost(format!("connection closed with code {}", code))
            }
            (Connected | Connecting, StreamEvent::ConnectionError(reason)) => self.lost(reason),

            (Reconnecting, StreamEvent::ReconnectTimerFired) => {
                self.attempt += 1;
                self.state = Connecting;
                vec![StreamAction::Connect]
            }

            (Connected, StreamEvent::KeepaliveTick) => vec![StreamAction::SendPing],

            (_, StreamEvent::CloseRequested) => {
                let was = self.state;
                self.state = Disconnected;
                self.attempt = 0;
                self.last_error = None;

                match was {
                    Reconnecting => vec![StreamAction::CancelReconnect],
                    Connected => vec![StreamAction::StopKeepalive, StreamAction::CloseConnection],
                    Connecting => vec![StreamAction::CloseConnection],
                    Disconnected | Failed => Vec::new(),
                }
            }

            // Stale timer, tick or close report for a state that moved on
            _ => Vec::new(),
        }
    }

    fn lost(&mut self, reason: String) -> Vec<StreamAction> {
        let mut actions = Vec::new();
        if self.state == ConnectionState::Connected {
            actions.push(StreamAction::StopKeepalive);
        }

        if self.attempt >= self.policy.max_attempts {
            self.state = ConnectionState::Failed;
            self.last_error = Some(format!(
                "giving up after {} reconnect attempt(s): {}",
                self.attempt, reason
            ));
            return actions;
        }

        self.state = ConnectionState::Reconnecting;
        self.last_error = Some(reason);
        actions.push(StreamAction::ScheduleReconnect(self.policy.delay(self.attempt)));
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::domain::stream::ABNORMAL_CLOSURE;

    fn connected() -> StreamMachine {
        let mut machine = StreamMachine::new(ReconnectPolicy::default());
        machine.handle(StreamEvent::OpenRequested);
        machine.handle(StreamEvent::Handshake);
        machine
    }

    #[test]
    fn test_delay_doubles_and_clamps() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (0..7).map(|n| policy.delay(n).as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]);
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(30000));
    }

    #[test]
    fn test_open_and_handshake() {
        let mut machine = StreamMachine::new(ReconnectPolicy::default());

        assert_eq!(machine.handle(StreamEvent::OpenRequested), vec![StreamAction::Connect]);
        assert_eq!(machine.state(), ConnectionState::Connecting);

        assert_eq!(machine.handle(StreamEvent::Handshake), vec![StreamAction::StartKeepalive]);
        assert_eq!(machine.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_open_is_ignored_unless_disconnected() {
        let mut machine = connected();
        assert!(machine.handle(StreamEvent::OpenRequested).is_empty());
        assert_eq!(machine.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_normal_close_does_not_reconnect() {
        let mut machine = connected();

        let actions = machine.handle(StreamEvent::Closed { code: NORMAL_CLOSURE });

        assert_eq!(actions, vec![StreamAction::StopKeepalive]);
        assert_eq!(machine.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_abnormal_close_schedules_reconnect() {
        let mut machine = connected();

        let actions = machine.handle(StreamEvent::Closed { code: ABNORMAL_CLOSURE });

        assert_eq!(actions, vec![
            StreamAction::StopKeepalive,
            StreamAction::ScheduleReconnect(Duration::from_millis(1000)),
        ]);
        assert_eq!(machine.state(), ConnectionState::Reconnecting);
        assert!(machine.last_error().unwrap().contains("1006"));
    }

    #[test]
    fn test_backoff_sequence_then_failed() {
        let mut machine = StreamMachine::new(ReconnectPolicy::default());
        machine.handle(StreamEvent::OpenRequested);

        let mut delays = Vec::new();
        loop {
            let actions = machine.handle(StreamEvent::ConnectionError("refused".into()));
            match actions.as_slice() {
                [StreamAction::ScheduleReconnect(delay)] => {
                    delays.push(delay.as_millis());
                    assert_eq!(
                        machine.handle(StreamEvent::ReconnectTimerFired),
                        vec![StreamAction::Connect]
                    );
                }
                [] => break,
                other => panic!("unexpected actions {:?}", other),
            }
        }

        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
        assert_eq!(machine.state(), ConnectionState::Failed);
        assert_eq!(machine.attempt(), 5);
        assert!(machine.last_error().unwrap().contains("giving up"));

        // Failed is terminal for stream events
        assert!(machine.handle(StreamEvent::ReconnectTimerFired).is_empty());
        assert!(machine.handle(StreamEvent::OpenRequested).is_empty());
        assert_eq!(machine.state(), ConnectionState::Failed);
    }

    #[test]
    fn test_handshake_resets_attempts() {
        let mut machine = connected();
        machine.handle(StreamEvent::Closed { code: ABNORMAL_CLOSURE });
        machine.handle(StreamEvent::ReconnectTimerFired);
        machine.handle(StreamEvent::ConnectionError("refused".into()));
        machine.handle(StreamEvent::ReconnectTimerFired);
        assert_eq!(machine.attempt(), 2);

        machine.handle(StreamEvent::Handshake);
        assert_eq!(machine.attempt(), 0);
        assert_eq!(machine.last_error(), None);

        let actions = machine.handle(StreamEvent::Closed { code: ABNORMAL_CLOSURE });
        assert!(actions.contains(&StreamAction::ScheduleReconnect(Duration::from_millis(1000))));
    }

    #[test]
    fn test_keepalive_only_when_connected() {
        let mut machine = connected();
        assert_eq!(machine.handle(StreamEvent::KeepaliveTick), vec![StreamAction::SendPing]);

        machine.handle(StreamEvent::Closed { code: ABNORMAL_CLOSURE });
        assert!(machine.handle(StreamEvent::KeepaliveTick).is_empty());
    }

    #[test]
    fn test_close_cancels_pending_reconnect() {
        let mut machine = connected();
        machine.handle(StreamEvent::Closed { code: ABNORMAL_CLOSURE });

        assert_eq!(
            machine.handle(StreamEvent::CloseRequested),
            vec![StreamAction::CancelReconnect]
        );
        assert_eq!(machine.state(), ConnectionState::Disconnected);

        // Late timer and repeated close are no-ops
        assert!(machine.handle(StreamEvent::ReconnectTimerFired).is_empty());
        assert!(machine.handle(StreamEvent::CloseRequested).is_empty());
    }

    #[test]
    fn test_close_from_failed_allows_reopen() {
        let mut machine = StreamMachine::new(ReconnectPolicy {
            max_attempts: 0,
            ..ReconnectPolicy::default()
        });
        machine.handle(StreamEvent::OpenRequested);
        machine.handle(StreamEvent::ConnectionError("refused".into()));
        assert!(machine.state().is_failed());

        machine.handle(StreamEvent::CloseRequested);
        assert_eq!(machine.handle(StreamEvent::OpenRequested), vec![StreamAction::Connect]);
    }
}
