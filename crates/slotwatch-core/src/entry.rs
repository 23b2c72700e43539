//! Log entries and their identities.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Event kinds produced by the client itself rather than the server.
pub mod kind {
    /// Connection attempt started
    pub const CONNECTING: &str = "connecting";
    /// Push channel is open
    pub const CONNECTION: &str = "connection";
    /// Reconnect scheduled after a drop
    pub const RECONNECTING: &str = "reconnecting";
    /// Client closed the push channel on request
    pub const DISCONNECTION: &str = "disconnection";
    /// Diagnostics: malformed frames, poll failures, control failures
    pub const ERROR: &str = "error";
    /// Monitor start acknowledged by the service
    pub const MONITOR_STARTED: &str = "monitor_started";
    /// Monitor stop acknowledged by the service
    pub const MONITOR_STOPPED: &str = "monitor_stopped";
    /// Booking request accepted by the service
    pub const BOOKING_TRIGGERED: &str = "booking_triggered";
}

/// Unique log entry identity.
///
/// Receipt time alone collides when frames arrive within the same
/// millisecond, so the id also carries a per-client random instance nonce and
/// a sequence number that never repeats within one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LogEntryId {
    received_ms: i64,
    instance: u32,
    seq: u64,
}

impl LogEntryId {
    /// Sequence number within the issuing client.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Receipt time in Unix milliseconds.
    pub fn received_ms(&self) -> i64 {
        self.received_ms
    }
}

impl fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:08x}-{}", self.received_ms, self.instance, self.seq)
    }
}

/// Issues [`LogEntryId`]s for one client.
#[derive(Debug, Clone)]
pub struct EntryIds {
    instance: u32,
    next_seq: u64,
}

impl EntryIds {
    /// Create a generator with the given random instance nonce.
    pub fn new(instance: u32) -> Self {
        Self { instance, next_seq: 0 }
    }

    /// Next id for an entry received at `received_at`.
    pub fn next(&mut self, received_at: DateTime<Utc>) -> LogEntryId {
        let seq = self.next_seq;
        self.next_seq += 1;
        LogEntryId { received_ms: received_at.timestamp_millis(), instance: self.instance, seq }
    }
}

/// One retained unit of observed activity. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    id: LogEntryId,
    timestamp: DateTime<Utc>,
    event_kind: String,
    message: String,
}

impl LogEntry {
    pub(crate) fn new(
        id: LogEntryId,
        timestamp: DateTime<Utc>,
        event_kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { id, timestamp, event_kind: event_kind.into(), message: message.into() }
    }

    /// Unique id.
    pub fn id(&self) -> LogEntryId {
        self.id
    }

    /// Server timestamp when provided, otherwise local receipt time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Event class.
    pub fn event_kind(&self) -> &str {
        &self.event_kind
    }

    /// Human-readable text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.timestamp.format("%H:%M:%S"), self.event_kind, self.message)
    }
}
