//! Push channel frames.
//!
//! Every text message on the push channel is a JSON object:
//!
//! ```text
//! {"event": "slots_found", "message": "3 slots in Maputo", "timestamp": "2024-01-01T00:00:00"}
//! ```
//!
//! `event` is required. `message` may be absent (the heartbeat ack carries
//! only `{"event": "pong"}`) and `timestamp` is optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Result, timestamp};

/// Event name the server uses to acknowledge a heartbeat.
pub const HEARTBEAT_ACK_EVENT: &str = "pong";

/// Text payload the client sends as a heartbeat.
pub const HEARTBEAT_PING: &str = "ping";

/// A decoded push channel frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFrame {
    /// Event class, e.g. `monitor_started` or `slots_found`
    pub event: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Server-side emission time, ISO-8601
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl PushFrame {
    /// Build a frame with a message and no timestamp.
    pub fn new(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self { event: event.into(), message: Some(message.into()), timestamp: None }
    }

    /// Attach a server timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Decode a raw text payload.
    pub fn decode(raw: &str) -> Result<Self> {
        let frame: Self = serde_json::from_str(raw)?;
        if frame.event.trim().is_empty() {
            return Err(ProtocolError::EmptyEvent);
        }
        Ok(frame)
    }

    /// Encode as a JSON text payload.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether this frame is a heartbeat acknowledgment.
    pub fn is_heartbeat_ack(&self) -> bool {
        self.event == HEARTBEAT_ACK_EVENT
    }

    /// Message text, empty when the server omitted it.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// Parsed server timestamp, if present and well-formed.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(timestamp::parse_iso8601)
    }
}
