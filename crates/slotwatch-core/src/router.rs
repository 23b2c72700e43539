//! Push payload classification.
//!
//! The router is the only place log entries are built. Server events become
//! entries of their own kind; heartbeat acknowledgments are plumbing and are
//! dropped; anything that does not decode becomes a single diagnostic entry.
//! Nothing here can fail the connection.

use chrono::{DateTime, Utc};
use slotwatch_proto::{ProtocolError, PushFrame};
use tracing::{debug, warn};

use crate::{
    LogEntry,
    entry::{EntryIds, kind},
};

/// Message recorded for payloads that do not decode.
pub const MALFORMED_MESSAGE: &str = "malformed message";

/// Result of routing one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A server event to retain
    Event(LogEntry),
    /// A heartbeat acknowledgment, not retained
    Heartbeat,
    /// Undecodable payload, replaced by a diagnostic entry
    Malformed(LogEntry),
}

impl RouteOutcome {
    /// Entry to append, if any.
    pub fn into_entry(self) -> Option<LogEntry> {
        match self {
            Self::Event(entry) | Self::Malformed(entry) => Some(entry),
            Self::Heartbeat => None,
        }
    }
}

/// Classifies push payloads and issues log entries.
#[derive(Debug, Clone)]
pub struct EventRouter {
    ids: EntryIds,
}

impl EventRouter {
    /// Create a router whose entry ids carry `instance`.
    pub fn new(instance: u32) -> Self {
        Self { ids: EntryIds::new(instance) }
    }

    /// Classify a raw text payload received at `received_at`.
    pub fn route(&mut self, payload: &str, received_at: DateTime<Utc>) -> RouteOutcome {
        let frame = match PushFrame::decode(payload) {
            Ok(frame) => frame,
            Err(err) => return RouteOutcome::Malformed(self.malformed(&err, received_at)),
        };

        if frame.is_heartbeat_ack() {
            debug!("heartbeat ack");
            return RouteOutcome::Heartbeat;
        }

        let timestamp = frame.parsed_timestamp().unwrap_or(received_at);
        let id = self.ids.next(received_at);
        RouteOutcome::Event(LogEntry::new(id, timestamp, frame.event.as_str(), frame.message()))
    }

    /// Build an entry produced by the client itself.
    pub fn synthetic(
        &mut self,
        event_kind: &str,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> LogEntry {
        let id = self.ids.next(at);
        LogEntry::new(id, at, event_kind, message)
    }

    fn malformed(&mut self, err: &ProtocolError, received_at: DateTime<Utc>) -> LogEntry {
        warn!(error = %err, "dropping malformed push payload");
        self.synthetic(kind::ERROR, MALFORMED_MESSAGE, received_at)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn event_uses_server_timestamp() {
        let mut router = EventRouter::new(1);
        let payload = PushFrame::new("monitor_started", "started")
            .with_timestamp("2024-01-01T00:00:00Z")
            .encode()
            .unwrap();
        let outcome = router.route(&payload, received());

        let RouteOutcome::Event(entry) = outcome else {
            panic!("expected an event entry");
        };
        assert_eq!(entry.event_kind(), "monitor_started");
        assert_eq!(entry.message(), "started");
        assert_eq!(entry.timestamp(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(entry.id().received_ms(), received().timestamp_millis());
    }

    #[test]
    fn event_without_timestamp_uses_receipt_time() {
        let mut router = EventRouter::new(1);
        let payload = PushFrame::new("slot_check", "checking").encode().unwrap();
        let entry = router.route(&payload, received()).into_entry().unwrap();
        assert_eq!(entry.timestamp(), received());
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_receipt_time() {
        let mut router = EventRouter::new(1);
        let payload = PushFrame::new("slot_check", "m").with_timestamp("soon").encode().unwrap();
        let entry = router.route(&payload, received()).into_entry().unwrap();
        assert_eq!(entry.timestamp(), received());
    }

    #[test]
    fn pong_is_dropped() {
        let mut router = EventRouter::new(1);
        assert_eq!(router.route(r#"{"event":"pong"}"#, received()), RouteOutcome::Heartbeat);
    }

    #[test]
    fn malformed_payload_becomes_one_diagnostic() {
        let mut router = EventRouter::new(1);
        for payload in ["not json", r#"{"message":"no event"}"#, "42", r#"{"event":""}"#] {
            let RouteOutcome::Malformed(entry) = router.route(payload, received()) else {
                panic!("expected malformed for {payload}");
            };
            assert_eq!(entry.event_kind(), kind::ERROR);
            assert_eq!(entry.message(), MALFORMED_MESSAGE);
        }
    }

    #[test]
    fn ids_never_repeat() {
        let mut router = EventRouter::new(1);
        let a = router.route(r#"{"event":"a","message":"1"}"#, received()).into_entry().unwrap();
        let b = router.synthetic(kind::CONNECTION, "Connected", received());
        assert_ne!(a.id(), b.id());
    }

    fn payload_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(r#"{"event":"pong"}"#.to_string()),
            "[a-z_]{1,12}".prop_map(|event| format!(r#"{{"event":"{event}","message":"m"}}"#)),
            ".{0,20}",
        ]
    }

    proptest! {
        #[test]
        fn prop_pong_never_becomes_an_entry(
            payloads in prop::collection::vec(payload_strategy(), 0..60)
        ) {
            let mut router = EventRouter::new(9);
            for payload in payloads {
                if let Some(entry) = router.route(&payload, received()).into_entry() {
                    prop_assert_ne!(entry.event_kind(), "pong");
                }
            }
        }
    }
}
