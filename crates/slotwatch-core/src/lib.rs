//! slotwatch synchronization core
//!
//! Pure state machine logic for the dashboard client, completely decoupled
//! from sockets, HTTP and timers.
//!
//! # Architecture
//!
//! The client observes a monitoring worker through two independent channels:
//! a push connection that streams events and a poll loop that fetches
//! authoritative snapshots. Both are driven by the same [`Client`] aggregate,
//! which accepts [`ClientEvent`]s and returns [`ClientAction`]s describing the
//! I/O a runtime must perform (open a socket, arm a timer, issue a poll).
//! Completions come back in as further events, tagged with the connection,
//! timer or poll sequence they belong to, so late or superseded completions
//! can be recognised and dropped.
//!
//! Nothing in this crate blocks, spawns or reads a clock on its own. Time and
//! randomness come from an [`Environment`] supplied by the caller.
//!
//! # Components
//!
//! - [`router`]: classifies raw push payloads into log entries
//! - [`log_buffer`]: bounded newest-first retention of entries
//! - [`connection`]: push connection lifecycle with bounded backoff
//! - [`poll`]: sequenced snapshot reconciliation
//! - [`control`]: start/stop/booking affordances and messages
//! - [`client`]: the aggregate tying the above together
//! - [`mod@env`]: Environment abstraction (time, RNG)

pub mod client;
pub mod connection;
pub mod control;
pub mod entry;
pub mod env;
pub mod error;
pub mod log_buffer;
pub mod poll;
pub mod reconnect;
pub mod router;
pub mod snapshot;

pub use client::{Client, ClientAction, ClientConfig, ClientEvent, ClientView};
pub use connection::{ConnectionId, ConnectionManager, ConnectionState, TimerId};
pub use control::{
    ControlCommand, ControlFailure, ControlKind, ControlRequest, ControlSuccess, Controls,
};
pub use entry::{LogEntry, LogEntryId};
pub use env::Environment;
pub use error::ClientError;
pub use log_buffer::LogBuffer;
pub use poll::{PollOutcome, PollReconciler, PollResponse, PollSeq};
pub use reconnect::ReconnectPolicy;
pub use router::{EventRouter, RouteOutcome};
pub use snapshot::{MonitorSnapshot, MonitorStats};
