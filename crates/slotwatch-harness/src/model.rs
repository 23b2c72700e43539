//! Reference model of the synchronization client.
//!
//! A deliberately naive re-statement of the connection lifecycle and log
//! retention rules, used as an oracle: model-based tests apply the same
//! [`Operation`] sequence to the model and to the real client and compare
//! [`Observation`]s after every step.
//!
//! Operations are phrased from the runtime's point of view ("the current
//! handshake succeeded", "the armed retry timer fired"). The model decides
//! from its own state whether each one has any effect; the real client must
//! reach the same conclusion through its id bookkeeping.

use slotwatch_core::ConnectionState;

/// Event kind the model uses for push events.
pub const PUSH_EVENT_KIND: &str = "slot_check";

/// One step of a generated scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// User starts syncing
    Start,
    /// User stops syncing
    Stop,
    /// User asks for a reconnect
    Restart,
    /// Handshake of the most recent attempt succeeded
    HandshakeSucceeded,
    /// Handshake of the most recent attempt failed
    HandshakeFailed,
    /// Most recent socket closed with `code`
    ConnectionDropped {
        /// Close code
        code: u16,
    },
    /// A socket from an earlier attempt reports a close
    StaleConnectionClosed,
    /// Most recently armed retry timer fired
    ReconnectTimerFired,
    /// A retry timer from an earlier schedule fired
    StaleTimerFired,
    /// A well-formed event frame arrived
    PushEvent,
    /// A heartbeat reply arrived
    PushPong,
    /// An undecodable frame arrived
    PushMalformed,
    /// User cleared the log
    ClearLog,
}

/// What a test compares between model and real client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Connection state
    pub state: ConnectionState,
    /// Kinds of retained entries, newest first
    pub log_kinds: Vec<String>,
    /// Whether the client has been stopped
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    NotStarted,
    Running,
    Stopped,
}

/// The reference model.
#[derive(Debug, Clone)]
pub struct ModelClient {
    lifecycle: Lifecycle,
    state: ConnectionState,
    attempt: u32,
    max_attempts: u32,
    capacity: usize,
    log: Vec<&'static str>,
}

impl ModelClient {
    /// Model with the given retry limit and log capacity.
    pub fn new(max_attempts: u32, capacity: usize) -> Self {
        Self {
            lifecycle: Lifecycle::NotStarted,
            state: ConnectionState::Idle,
            attempt: 0,
            max_attempts,
            capacity,
            log: Vec::new(),
        }
    }

    /// Current observation.
    pub fn observe(&self) -> Observation {
        Observation {
            state: self.state,
            log_kinds: self.log.iter().map(|kind| (*kind).to_string()).collect(),
            stopped: self.lifecycle == Lifecycle::Stopped,
        }
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: Operation) {
        match (self.lifecycle, op) {
            (_, Operation::ClearLog) => self.log.clear(),
            (Lifecycle::Stopped, _) => {},
            (_, Operation::Stop) => {
                self.lifecycle = Lifecycle::Stopped;
                if self.state != ConnectionState::Closed {
                    self.enter(ConnectionState::Closed);
                }
            },
            (Lifecycle::NotStarted, Operation::Start | Operation::Restart) => {
                self.lifecycle = Lifecycle::Running;
                self.attempt = 0;
                self.enter(ConnectionState::Connecting);
            },
            (Lifecycle::NotStarted, _) => {},
            (Lifecycle::Running, op) => self.apply_running(op),
        }
    }

    fn apply_running(&mut self, op: Operation) {
        match op {
            Operation::Restart => {
                let restartable = matches!(
                    self.state,
                    ConnectionState::Idle
                        | ConnectionState::Failed
                        | ConnectionState::Reconnecting(_)
                );
                if restartable {
                    self.attempt = 0;
                    self.enter(ConnectionState::Connecting);
                }
            },
            Operation::HandshakeSucceeded => {
                if self.state == ConnectionState::Connecting {
                    self.attempt = 0;
                    self.enter(ConnectionState::Open);
                }
            },
            Operation::HandshakeFailed => {
                if self.state == ConnectionState::Connecting {
                    self.retry();
                }
            },
            Operation::ConnectionDropped { .. } => {
                if matches!(self.state, ConnectionState::Connecting | ConnectionState::Open) {
                    self.retry();
                }
            },
            Operation::ReconnectTimerFired => {
                if matches!(self.state, ConnectionState::Reconnecting(_)) {
                    self.enter(ConnectionState::Connecting);
                }
            },
            Operation::PushEvent if self.state == ConnectionState::Open => {
                self.append(PUSH_EVENT_KIND);
            },
            Operation::PushMalformed if self.state == ConnectionState::Open => {
                self.append("error");
            },
            Operation::Start
            | Operation::Stop
            | Operation::ClearLog
            | Operation::StaleConnectionClosed
            | Operation::StaleTimerFired
            | Operation::PushEvent
            | Operation::PushPong
            | Operation::PushMalformed => {},
        }
    }

    fn retry(&mut self) {
        let next = self.attempt + 1;
        if next > self.max_attempts {
            self.enter(ConnectionState::Failed);
        } else {
            self.attempt = next;
            self.enter(ConnectionState::Reconnecting(next));
        }
    }

    fn enter(&mut self, state: ConnectionState) {
        self.state = state;
        let kind = match state {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "connection",
            ConnectionState::Reconnecting(_) => "reconnecting",
            ConnectionState::Closed => "disconnection",
            ConnectionState::Failed => "error",
            ConnectionState::Idle => return,
        };
        self.append(kind);
    }

    fn append(&mut self, kind: &'static str) {
        self.log.insert(0, kind);
        self.log.truncate(self.capacity);
    }
}
