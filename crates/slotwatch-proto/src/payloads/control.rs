//! Control request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Monitor runtime options sent with a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between slot checks on the worker side
    pub check_interval: u64,
}

/// Body of `POST /monitors/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartMonitorRequest {
    /// Booking flow to monitor
    pub flow: String,
    /// Applicant id; the service generates one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<String>,
    /// Worker options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<MonitorConfig>,
}

/// Body of `POST /monitors/{id}/stop` on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopMonitorResponse {
    /// Confirmation text
    #[serde(default)]
    pub message: Option<String>,
    /// Monitor that was stopped
    #[serde(default)]
    pub monitor_id: Option<i64>,
}

/// Body of `POST /bookings/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Applicant to book for
    pub applicant_id: String,
    /// Worker run that found the slots
    pub run_id: String,
    /// Free-form form fields forwarded to the booking worker
    pub form_data: Value,
}

/// Error body the service attaches to non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Either a string or a list of validation errors
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ApiErrorBody {
    /// Human-readable detail, if the body carried one.
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
