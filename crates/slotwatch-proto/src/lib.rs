//! Wire format for the slotwatch dashboard.
//!
//! Two surfaces are described here. The push channel carries small JSON event
//! frames (`{event, message, timestamp?}`) from the monitor service to every
//! connected dashboard, plus the literal `"ping"` / `{"event":"pong"}`
//! heartbeat pair. The Monitor Service API is plain JSON over HTTP: two read
//! endpoints polled for authoritative status and three control endpoints.
//!
//! Types in this crate only describe shapes and parsing. They carry no
//! connection state and perform no I/O.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod frame;
pub mod payloads;
pub mod timestamp;

pub use errors::{ProtocolError, Result};
pub use frame::{HEARTBEAT_ACK_EVENT, HEARTBEAT_PING, PushFrame};
pub use payloads::{
    ActiveMonitor, ApiErrorBody, BookingRequest, MonitorConfig, MonitorRecord,
    MonitorStatusResponse, MonitorSummary, StartMonitorRequest, StopMonitorResponse,
};
