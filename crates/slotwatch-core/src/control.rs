//! Monitor controls.
//!
//! Start, stop and booking are single request/response exchanges with no
//! retry. The core decides whether a control is permitted, builds the
//! request, and turns the outcome into a log entry and, on failure, one
//! user-visible error.

use serde::Serialize;
use slotwatch_proto::{BookingRequest, StartMonitorRequest};

use crate::entry::kind;

/// Control the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControlRequest {
    /// Start a monitor for the configured flow
    StartMonitor,
    /// Stop the active monitor
    StopMonitor,
    /// Trigger a booking for the active monitor's run
    TriggerBooking,
}

impl ControlRequest {
    /// Which control this is.
    pub fn kind(self) -> ControlKind {
        match self {
            Self::StartMonitor => ControlKind::Start,
            Self::StopMonitor => ControlKind::Stop,
            Self::TriggerBooking => ControlKind::Booking,
        }
    }
}

/// Control family, used for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControlKind {
    /// Monitor start
    Start,
    /// Monitor stop
    Stop,
    /// Booking trigger
    Booking,
}

impl ControlKind {
    /// Message shown when the service gives no detail.
    pub fn default_failure(self) -> &'static str {
        match self {
            Self::Start => "Failed to start monitoring",
            Self::Stop => "Failed to stop monitoring",
            Self::Booking => "Failed to start booking",
        }
    }
}

/// Request the runtime must send to the Monitor Service API.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// `POST /monitors/`
    StartMonitor(StartMonitorRequest),
    /// `POST /monitors/{id}/stop`
    StopMonitor {
        /// Monitor to stop
        monitor_id: i64,
    },
    /// `POST /bookings/`
    TriggerBooking(BookingRequest),
}

impl ControlCommand {
    /// Which control this command carries out.
    pub fn kind(&self) -> ControlKind {
        match self {
            Self::StartMonitor(_) => ControlKind::Start,
            Self::StopMonitor { .. } => ControlKind::Stop,
            Self::TriggerBooking(_) => ControlKind::Booking,
        }
    }
}

/// Successful control outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSuccess {
    /// Service created monitor `monitor_id`
    MonitorStarted {
        /// Id assigned by the service
        monitor_id: i64,
    },
    /// Service stopped the monitor
    MonitorStopped,
    /// Service accepted the booking
    BookingTriggered,
}

impl ControlSuccess {
    /// Log entry kind.
    pub fn entry_kind(&self) -> &'static str {
        match self {
            Self::MonitorStarted { .. } => kind::MONITOR_STARTED,
            Self::MonitorStopped => kind::MONITOR_STOPPED,
            Self::BookingTriggered => kind::BOOKING_TRIGGERED,
        }
    }

    /// Log entry message.
    pub fn message(&self) -> String {
        match self {
            Self::MonitorStarted { monitor_id } => {
                format!("Monitor {monitor_id} started successfully")
            },
            Self::MonitorStopped => "Monitoring stopped successfully".to_string(),
            Self::BookingTriggered => "Booking triggered, browser opening...".to_string(),
        }
    }

    /// Whether monitor state changed, so a fresh poll is warranted.
    pub fn refreshes_status(&self) -> bool {
        matches!(self, Self::MonitorStarted { .. } | Self::MonitorStopped)
    }
}

/// Failed control outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlFailure {
    /// Service-provided detail, if any
    pub detail: Option<String>,
}

impl ControlFailure {
    /// Failure carrying the service's detail text.
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self { detail: Some(detail.into()) }
    }

    /// Message to show for a failed `kind` control.
    pub fn message(&self, kind: ControlKind) -> String {
        match self.detail.as_deref() {
            Some(detail) if !detail.trim().is_empty() => detail.to_string(),
            _ => kind.default_failure().to_string(),
        }
    }
}

/// Which controls the user may use right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Controls {
    /// Start is offered
    pub can_start: bool,
    /// Stop is offered
    pub can_stop: bool,
    /// Booking is offered
    pub can_book: bool,
}

impl Controls {
    /// Affordances for the given busy flag and monitoring status.
    pub fn derive(busy: bool, monitoring: bool) -> Self {
        Self {
            can_start: !busy && !monitoring,
            can_stop: !busy && monitoring,
            can_book: !busy && monitoring,
        }
    }

    /// Whether `request` is currently offered.
    pub fn permits(&self, request: ControlRequest) -> bool {
        match request {
            ControlRequest::StartMonitor => self.can_start,
            ControlRequest::StopMonitor => self.can_stop,
            ControlRequest::TriggerBooking => self.can_book,
        }
    }
}
