//! Read models for monitor status polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp;

/// Status value the service uses for a running monitor.
pub const ACTIVE_STATUS: &str = "active";

/// One row of `GET /monitors/`, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSummary {
    /// Monitor id
    pub id: i64,
    /// Booking flow name
    pub flow: String,
    /// Lifecycle status (`active`, `stopped`, ...)
    pub status: String,
    /// Creation time
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
    /// Applicant the monitor runs for
    #[serde(default)]
    pub applicant_id: Option<String>,
    /// Worker run id
    #[serde(default)]
    pub run_id: Option<String>,
}

impl MonitorSummary {
    /// Whether the service reports this monitor as running.
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }
}

/// Body returned by `POST /monitors/`. Same shape as a list row.
pub type MonitorRecord = MonitorSummary;

/// `active_monitor` object as the service sends it.
///
/// When nothing is active the service still sends the object, with every
/// field `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMonitorFields {
    /// Monitor id, `null` when no monitor is active
    #[serde(default)]
    pub id: Option<i64>,
    /// Applicant id
    #[serde(default)]
    pub applicant_id: Option<String>,
    /// Worker run id
    #[serde(default)]
    pub run_id: Option<String>,
    /// Lifecycle status
    #[serde(default)]
    pub status: Option<String>,
    /// Creation time
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `GET /monitors/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatusResponse {
    /// Currently active monitor, possibly all-null
    #[serde(default)]
    pub active_monitor: Option<ActiveMonitorFields>,
    /// Number of push channel subscribers the service currently holds
    #[serde(default)]
    pub websocket_connections: Option<u64>,
}

impl MonitorStatusResponse {
    /// Status response describing one active monitor.
    pub fn with_active(active: &ActiveMonitor) -> Self {
        Self {
            active_monitor: Some(ActiveMonitorFields {
                id: Some(active.id),
                applicant_id: active.applicant_id.clone(),
                run_id: active.run_id.clone(),
                status: active.status.clone(),
                created_at: None,
            }),
            websocket_connections: None,
        }
    }

    /// Status response with nothing active, as the service formats it.
    pub fn idle() -> Self {
        Self { active_monitor: Some(ActiveMonitorFields::default()), websocket_connections: None }
    }

    /// The active monitor, if the service reports one.
    ///
    /// A monitor counts as active only when its `id` is present.
    pub fn active(&self) -> Option<ActiveMonitor> {
        let fields = self.active_monitor.as_ref()?;
        let id = fields.id?;
        Some(ActiveMonitor {
            id,
            applicant_id: fields.applicant_id.clone(),
            run_id: fields.run_id.clone(),
            status: fields.status.clone(),
        })
    }
}

/// Normalized active monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMonitor {
    /// Monitor id
    pub id: i64,
    /// Applicant id
    pub applicant_id: Option<String>,
    /// Worker run id, required to trigger a booking
    pub run_id: Option<String>,
    /// Lifecycle status, when reported
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_null_active_monitor_is_not_active() {
        let body = r#"{
            "active_monitor": {
                "id": null, "run_id": null, "applicant_id": null, "created_at": null
            },
            "websocket_connections": 2,
            "timestamp": "2024-01-01T00:00:00"
        }"#;
        let status: MonitorStatusResponse = serde_json::from_str(body).unwrap();
        assert!(status.active().is_none());
        assert_eq!(status.websocket_connections, Some(2));
    }

    #[test]
    fn null_active_monitor_is_not_active() {
        let status: MonitorStatusResponse =
            serde_json::from_str(r#"{"active_monitor": null}"#).unwrap();
        assert!(status.active().is_none());
    }

    #[test]
    fn active_monitor_with_id() {
        let body = r#"{"active_monitor": {"id": 7, "run_id": "run_abc", "applicant_id": "user_1",
            "created_at": "2024-01-01T10:00:00.5"}}"#;
        let status: MonitorStatusResponse = serde_json::from_str(body).unwrap();
        let active = status.active().unwrap();
        assert_eq!(active.id, 7);
        assert_eq!(active.run_id.as_deref(), Some("run_abc"));
        assert_eq!(active.applicant_id.as_deref(), Some("user_1"));
    }

    #[test]
    fn monitor_list_parses_naive_timestamps() {
        let body = r#"[
            {"id": 2, "flow": "mozambique-to-portugal", "status": "active",
             "created_at": "2024-01-02T08:00:00.000001", "run_id": "r2", "config": "{}"},
            {"id": 1, "flow": "mozambique-to-portugal", "status": "stopped",
             "created_at": "not a date"}
        ]"#;
        let monitors: Vec<MonitorSummary> = serde_json::from_str(body).unwrap();
        assert_eq!(monitors.len(), 2);
        assert!(monitors[0].is_active());
        assert!(monitors[0].created_at.is_some());
        assert!(!monitors[1].is_active());
        assert!(monitors[1].created_at.is_none());
    }

    #[test]
    fn with_active_round_trips_through_active() {
        let active = ActiveMonitor {
            id: 3,
            applicant_id: Some("a".into()),
            run_id: Some("r".into()),
            status: Some("active".into()),
        };
        assert_eq!(MonitorStatusResponse::with_active(&active).active(), Some(active));
        assert!(MonitorStatusResponse::idle().active().is_none());
    }
}
