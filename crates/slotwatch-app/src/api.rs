//! Monitor Service API seam.

use async_trait::async_trait;
use slotwatch_proto::{
    BookingRequest, MonitorRecord, MonitorStatusResponse, MonitorSummary, StartMonitorRequest,
    StopMonitorResponse,
};
use thiserror::Error;

/// Failures talking to the Monitor Service API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a response
    #[error("request failed: {0}")]
    Request(String),

    /// Service answered with a non-success status
    #[error("service returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// `detail` from the error body, when present
        detail: Option<String>,
    },

    /// Response body did not decode
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Service-provided explanation, for display to the user.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Status { detail, .. } => detail.clone(),
            Self::Request(_) | Self::Decode(_) => None,
        }
    }
}

/// The Monitor Service API as the client uses it.
#[async_trait]
pub trait MonitorApi: Send + Sync + 'static {
    /// `GET /monitors/`
    async fn list_monitors(&self) -> Result<Vec<MonitorSummary>, ApiError>;

    /// `GET /monitors/status`
    async fn monitor_status(&self) -> Result<MonitorStatusResponse, ApiError>;

    /// `POST /monitors/`
    async fn start_monitor(&self, request: &StartMonitorRequest) -> Result<MonitorRecord, ApiError>;

    /// `POST /monitors/{id}/stop`
    async fn stop_monitor(&self, monitor_id: i64) -> Result<StopMonitorResponse, ApiError>;

    /// `POST /bookings/`. The booking record is opaque to the client.
    async fn create_booking(&self, request: &BookingRequest) -> Result<serde_json::Value, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_status_errors_carry_detail() {
        let status =
            ApiError::Status { status: 400, detail: Some("Monitor already running".into()) };
        assert_eq!(status.detail().as_deref(), Some("Monitor already running"));
        assert_eq!(status.to_string(), "service returned status 400");
        assert_eq!(ApiError::Request("timeout".into()).detail(), None);
    }
}
