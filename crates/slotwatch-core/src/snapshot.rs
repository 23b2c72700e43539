//! Authoritative monitor state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use slotwatch_proto::{ActiveMonitor, MonitorSummary};

use crate::PollSeq;

/// Monitor state as of one successful poll cycle.
///
/// Always replaced whole; never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorSnapshot {
    /// Monitor the service reports as running
    pub active_monitor: Option<ActiveMonitor>,
    /// Every monitor the service knows, in service order
    pub monitors: Vec<MonitorSummary>,
    /// Poll cycle that produced this snapshot
    pub seq: PollSeq,
    /// When the cycle completed
    pub fetched_at: DateTime<Utc>,
}

/// Counts derived from the monitor list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// All monitors
    pub total: usize,
    /// Monitors whose status is `active`
    pub active: usize,
}

impl MonitorSnapshot {
    /// Whether a monitor is running. Derived only from `active_monitor`.
    pub fn is_monitoring(&self) -> bool {
        self.active_monitor.is_some()
    }

    /// Monitor counts.
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            total: self.monitors.len(),
            active: self.monitors.iter().filter(|m| m.is_active()).count(),
        }
    }
}
