//! Push channel lifecycle.
//!
//! # Architecture: Action-Based State Machine
//!
//! [`ConnectionManager`] never touches a socket or a timer. Methods accept
//! time as a parameter and return [`ConnectionAction`]s; the runtime opens
//! sockets, arms timers and feeds completions back in. Every socket attempt is
//! tagged with a [`ConnectionId`] and every scheduled retry with a
//! [`TimerId`], so a completion that belongs to a superseded attempt is
//! recognised and ignored.
//!
//! # State Machine
//!
//! ```text
//!          start            handshake ok
//! ┌──────┐ ─────> ┌────────────┐ ─────> ┌──────┐
//! │ Idle │        │ Connecting │        │ Open │
//! └──────┘        └────────────┘ <──┐   └──────┘
//!                    │  handshake    │      │ unsolicited close
//!                    │  failed       │ timer│
//!                    ↓               │      ↓
//!              ┌──────────────────────────────┐  attempts   ┌────────┐
//!              │       Reconnecting(a)        │ ──────────> │ Failed │
//!              └──────────────────────────────┘  exhausted  └────────┘
//!
//!   stop() from any state ──> Closed (terminal)
//!   restart() from Idle, Reconnecting or Failed ──> Connecting, attempt 0
//! ```
//!
//! # Backoff
//!
//! Retry `a` waits [`ReconnectPolicy::delay_for`]`(a)`. The attempt counter
//! resets only when a handshake succeeds or on manual restart, so a channel
//! that opens and immediately drops still makes progress toward `Failed`
//! through the Connecting path.

use std::{
    fmt,
    time::{Duration, Instant},
};

use serde::Serialize;
use tracing::info;

use crate::{ReconnectPolicy, entry::kind};

/// Identity of one socket attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Raw value, for logging.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Identity of one scheduled reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub(crate) u64);

impl TimerId {
    /// Raw value, for logging.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Push channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    /// Never started
    Idle,
    /// Handshake in progress
    Connecting,
    /// Channel delivering frames
    Open,
    /// Stopped on request, terminal for the session
    Closed,
    /// Waiting to retry; carries the 1-based attempt number
    Reconnecting(u32),
    /// Retries exhausted, waiting for a manual restart
    Failed,
}

impl ConnectionState {
    /// Status line shown to the user.
    pub fn label(&self, max_attempts: u32) -> String {
        match self {
            Self::Idle | Self::Closed => "Disconnected".to_string(),
            Self::Connecting => "Connecting...".to_string(),
            Self::Open => "Connected".to_string(),
            Self::Reconnecting(attempt) => format!("Reconnecting ({attempt}/{max_attempts})..."),
            Self::Failed => "Connection Failed".to_string(),
        }
    }

    /// Whether the channel is up.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// One observable state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State before
    pub from: ConnectionState,
    /// State after
    pub to: ConnectionState,
    /// Human-readable explanation, recorded as the log message
    pub reason: String,
}

impl Transition {
    /// Log entry kind recording this transition.
    pub fn entry_kind(&self) -> &'static str {
        match self.to {
            ConnectionState::Idle | ConnectionState::Connecting => kind::CONNECTING,
            ConnectionState::Open => kind::CONNECTION,
            ConnectionState::Reconnecting(_) => kind::RECONNECTING,
            ConnectionState::Closed => kind::DISCONNECTION,
            ConnectionState::Failed => kind::ERROR,
        }
    }
}

/// Effects requested by [`ConnectionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a socket for this attempt
    Open(ConnectionId),
    /// Close the socket belonging to this attempt
    Close(ConnectionId),
    /// Arm a one-shot reconnect timer
    ScheduleReconnect {
        /// Timer identity to report back when it fires
        timer: TimerId,
        /// Delay before firing
        delay: Duration,
    },
    /// Disarm a previously scheduled reconnect timer
    CancelReconnect(TimerId),
    /// Send a heartbeat ping on this connection
    SendHeartbeat(ConnectionId),
    /// State changed
    Transition(Transition),
}

/// Owns the push channel lifecycle.
///
/// This is a pure state machine; no I/O and no stored Environment.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    state: ConnectionState,
    policy: ReconnectPolicy,
    heartbeat_interval: Option<Duration>,
    /// Retries used since the last successful handshake
    attempt: u32,
    current: Option<ConnectionId>,
    next_connection: u64,
    pending_timer: Option<TimerId>,
    next_timer: u64,
    last_heartbeat: Option<Instant>,
}

impl ConnectionManager {
    /// Create a manager in `Idle`.
    pub fn new(policy: ReconnectPolicy, heartbeat_interval: Option<Duration>) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy,
            heartbeat_interval,
            attempt: 0,
            current: None,
            next_connection: 0,
            pending_timer: None,
            next_timer: 0,
            last_heartbeat: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Retry policy in force.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Status line for the current state.
    pub fn status_label(&self) -> String {
        self.state.label(self.policy.max_attempts)
    }

    /// Attempt currently holding (or about to hold) the socket.
    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.current
    }

    /// Reconnect timer currently armed.
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    /// Begin connecting. Only acts from `Idle`.
    pub fn start(&mut self) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Idle => {
                self.attempt = 0;
                self.connect("Connecting to monitoring system".to_string())
            },
            _ => Vec::new(),
        }
    }

    /// Manual restart after `Failed`. Also short-circuits a pending retry
    /// and starts an `Idle` manager. Resets the attempt counter.
    pub fn restart(&mut self) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Failed | ConnectionState::Reconnecting(_) => {
                let mut actions = self.cancel_timer();
                self.attempt = 0;
                actions.extend(self.connect("Reconnecting to monitoring system".to_string()));
                actions
            },
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Closed => {
                Vec::new()
            },
        }
    }

    /// Tear down. Cancels any pending retry and closes any socket. No
    /// transition happens after this returns; repeated calls do nothing.
    pub fn stop(&mut self) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Closed {
            return Vec::new();
        }

        let mut actions = self.cancel_timer();
        if let Some(conn) = self.current.take() {
            actions.push(ConnectionAction::Close(conn));
        }
        self.last_heartbeat = None;
        actions.push(self.transition(ConnectionState::Closed, "Connection closed".to_string()));
        actions
    }

    /// Handshake for `conn` completed.
    ///
    /// A completion for a superseded attempt is answered with a `Close` so
    /// the orphaned socket does not linger.
    pub fn handshake_succeeded(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting || self.current != Some(conn) {
            return vec![ConnectionAction::Close(conn)];
        }

        self.attempt = 0;
        self.last_heartbeat = Some(now);
        vec![self.transition(ConnectionState::Open, "Connected to monitoring system".to_string())]
    }

    /// Handshake for `conn` failed.
    pub fn handshake_failed(&mut self, conn: ConnectionId, reason: &str) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting || self.current != Some(conn) {
            return Vec::new();
        }
        self.current = None;
        self.schedule_retry(&format!("Connection failed ({reason})"))
    }

    /// Socket for `conn` closed without being asked to.
    pub fn connection_closed(
        &mut self,
        conn: ConnectionId,
        code: Option<u16>,
    ) -> Vec<ConnectionAction> {
        if self.current != Some(conn) {
            return Vec::new();
        }
        let cause = match code {
            Some(code) => format!("Connection closed (code {code})"),
            None => "Connection closed".to_string(),
        };
        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => {
                self.current = None;
                self.last_heartbeat = None;
                self.schedule_retry(&cause)
            },
            _ => Vec::new(),
        }
    }

    /// Reconnect timer fired.
    pub fn reconnect_timer_fired(&mut self, timer: TimerId) -> Vec<ConnectionAction> {
        let ConnectionState::Reconnecting(attempt) = self.state else {
            return Vec::new();
        };
        if self.pending_timer != Some(timer) {
            return Vec::new();
        }
        self.pending_timer = None;
        let max = self.policy.max_attempts;
        self.connect(format!("Connecting to monitoring system (attempt {attempt}/{max})"))
    }

    /// Whether a frame read from `conn` should be processed.
    pub fn frame_allowed(&self, conn: ConnectionId) -> bool {
        self.state == ConnectionState::Open && self.current == Some(conn)
    }

    /// Periodic housekeeping: heartbeats while `Open`.
    pub fn tick(&mut self, now: Instant) -> Vec<ConnectionAction> {
        let (ConnectionState::Open, Some(interval), Some(conn)) =
            (self.state, self.heartbeat_interval, self.current)
        else {
            return Vec::new();
        };

        let due = match self.last_heartbeat {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        };
        if !due {
            return Vec::new();
        }

        self.last_heartbeat = Some(now);
        vec![ConnectionAction::SendHeartbeat(conn)]
    }

    fn connect(&mut self, reason: String) -> Vec<ConnectionAction> {
        let conn = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.current = Some(conn);
        let transition = self.transition(ConnectionState::Connecting, reason);
        vec![transition, ConnectionAction::Open(conn)]
    }

    fn schedule_retry(&mut self, cause: &str) -> Vec<ConnectionAction> {
        let next = self.attempt + 1;
        if next > self.policy.max_attempts {
            let reason = format!("{cause}. Max reconnection attempts reached");
            return vec![self.transition(ConnectionState::Failed, reason)];
        }

        self.attempt = next;
        let delay = self.policy.delay_for(next);
        let timer = TimerId(self.next_timer);
        self.next_timer += 1;
        self.pending_timer = Some(timer);

        let max = self.policy.max_attempts;
        let reason = format!(
            "{cause}. Reconnecting in {}s (attempt {next}/{max})",
            delay.as_secs_f64()
        );
        vec![
            self.transition(ConnectionState::Reconnecting(next), reason),
            ConnectionAction::ScheduleReconnect { timer, delay },
        ]
    }

    fn cancel_timer(&mut self) -> Vec<ConnectionAction> {
        self.pending_timer.take().map(ConnectionAction::CancelReconnect).into_iter().collect()
    }

    fn transition(&mut self, to: ConnectionState, reason: String) -> ConnectionAction {
        let from = self.state;
        self.state = to;
        info!(?from, ?to, %reason, "connection transition");
        ConnectionAction::Transition(Transition { from, to, reason })
    }
}
