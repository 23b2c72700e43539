//! Monitor Service API bodies.
//!
//! - [`monitor`]: read models returned by `GET /monitors/` and
//!   `GET /monitors/status`
//! - [`control`]: request and response bodies for start, stop and booking

pub mod control;
pub mod monitor;

pub use control::{
    ApiErrorBody, BookingRequest, MonitorConfig, StartMonitorRequest, StopMonitorResponse,
};
pub use monitor::{ActiveMonitor, MonitorRecord, MonitorStatusResponse, MonitorSummary};
