//! In-memory Monitor Service.
//!
//! Behaves like the real service closely enough for the client: one active
//! monitor at a time, run ids assigned on start, `detail` on rejections.
//! Tests inject failures and latency and inspect the calls made.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{Value, json};
use slotwatch_app::{ApiError, MonitorApi};
use slotwatch_proto::{
    ActiveMonitor, BookingRequest, MonitorRecord, MonitorStatusResponse, MonitorSummary,
    StartMonitorRequest, StopMonitorResponse,
};
use tracing::trace;

/// A request the client made.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    /// `GET /monitors/`
    ListMonitors,
    /// `GET /monitors/status`
    MonitorStatus,
    /// `POST /monitors/`
    StartMonitor(StartMonitorRequest),
    /// `POST /monitors/{id}/stop`
    StopMonitor(i64),
    /// `POST /bookings/`
    CreateBooking(BookingRequest),
}

#[derive(Debug, Default)]
struct Service {
    /// Newest first, like the real listing
    monitors: Vec<MonitorSummary>,
    next_id: i64,
    next_booking: i64,
    reads_fail: bool,
    list_delays: VecDeque<Duration>,
    control_failures: VecDeque<(u16, Option<String>)>,
    calls: Vec<ApiCall>,
}

impl Service {
    fn active(&self) -> Option<&MonitorSummary> {
        self.monitors.iter().find(|m| m.is_active())
    }

    fn insert(
        &mut self,
        flow: &str,
        applicant_id: Option<String>,
        with_run: bool,
    ) -> MonitorSummary {
        self.next_id += 1;
        let id = self.next_id;
        let monitor = MonitorSummary {
            id,
            flow: flow.to_string(),
            status: "active".to_string(),
            created_at: None,
            applicant_id,
            run_id: with_run.then(|| format!("run_{id}")),
        };
        self.monitors.insert(0, monitor.clone());
        monitor
    }

    fn status(&self) -> MonitorStatusResponse {
        match self.active() {
            Some(monitor) => MonitorStatusResponse::with_active(&ActiveMonitor {
                id: monitor.id,
                applicant_id: monitor.applicant_id.clone(),
                run_id: monitor.run_id.clone(),
                status: Some(monitor.status.clone()),
            }),
            None => MonitorStatusResponse::idle(),
        }
    }

    fn take_control_failure(&mut self) -> Option<ApiError> {
        self.control_failures
            .pop_front()
            .map(|(status, detail)| ApiError::Status { status, detail })
    }
}

/// Scriptable [`MonitorApi`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedApi {
    inner: Arc<Mutex<Service>>,
}

impl ScriptedApi {
    /// Service with no monitors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a monitor outside the client, as another dashboard would.
    /// Returns its id.
    pub fn start_external(&self, applicant_id: &str) -> i64 {
        self.state().insert("mozambique-to-portugal", Some(applicant_id.to_string()), true).id
    }

    /// Start a monitor whose worker has not reported a run yet.
    pub fn start_without_run(&self, applicant_id: &str) -> i64 {
        self.state().insert("mozambique-to-portugal", Some(applicant_id.to_string()), false).id
    }

    /// Stop whatever is active, outside the client.
    pub fn stop_external(&self) {
        let mut state = self.state();
        for monitor in state.monitors.iter_mut().filter(|m| m.is_active()) {
            monitor.status = "stopped".to_string();
        }
    }

    /// Make every read fail until called again with `false`.
    pub fn set_reads_failing(&self, failing: bool) {
        self.state().reads_fail = failing;
    }

    /// Delay the response to the next `GET /monitors/`. The monitor listing
    /// is captured before the delay, so a delayed response carries stale
    /// data.
    pub fn delay_next_list(&self, delay: Duration) {
        self.state().list_delays.push_back(delay);
    }

    /// Reject the next control request with `status` and optional `detail`.
    pub fn fail_next_control(&self, status: u16, detail: Option<&str>) {
        self.state().control_failures.push_back((status, detail.map(str::to_string)));
    }

    /// Currently active monitor.
    pub fn active(&self) -> Option<MonitorSummary> {
        self.state().active().cloned()
    }

    /// Every request made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    /// Control requests made so far, in order.
    pub fn control_calls(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, ApiCall::ListMonitors | ApiCall::MonitorStatus))
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, Service> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unreachable_service() -> ApiError {
    ApiError::Request("connection refused".to_string())
}

#[async_trait]
impl MonitorApi for ScriptedApi {
    async fn list_monitors(&self) -> Result<Vec<MonitorSummary>, ApiError> {
        let (result, delay) = {
            let mut state = self.state();
            state.calls.push(ApiCall::ListMonitors);
            let result = if state.reads_fail {
                Err(unreachable_service())
            } else {
                Ok(state.monitors.clone())
            };
            (result, state.list_delays.pop_front())
        };
        if let Some(delay) = delay {
            trace!(?delay, "delaying monitor listing");
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn monitor_status(&self) -> Result<MonitorStatusResponse, ApiError> {
        let mut state = self.state();
        state.calls.push(ApiCall::MonitorStatus);
        if state.reads_fail {
            return Err(unreachable_service());
        }
        Ok(state.status())
    }

    async fn start_monitor(
        &self,
        request: &StartMonitorRequest,
    ) -> Result<MonitorRecord, ApiError> {
        let mut state = self.state();
        state.calls.push(ApiCall::StartMonitor(request.clone()));
        if let Some(err) = state.take_control_failure() {
            return Err(err);
        }
        if state.active().is_some() {
            return Err(ApiError::Status {
                status: 400,
                detail: Some("Monitor already running".to_string()),
            });
        }
        Ok(state.insert(&request.flow, request.applicant_id.clone(), true))
    }

    async fn stop_monitor(&self, monitor_id: i64) -> Result<StopMonitorResponse, ApiError> {
        let mut state = self.state();
        state.calls.push(ApiCall::StopMonitor(monitor_id));
        if let Some(err) = state.take_control_failure() {
            return Err(err);
        }
        let Some(monitor) = state.monitors.iter_mut().find(|m| m.id == monitor_id && m.is_active())
        else {
            return Err(ApiError::Status {
                status: 404,
                detail: Some("Monitor not found".to_string()),
            });
        };
        monitor.status = "stopped".to_string();
        Ok(StopMonitorResponse {
            message: Some("Monitor stopped".to_string()),
            monitor_id: Some(monitor_id),
        })
    }

    async fn create_booking(&self, request: &BookingRequest) -> Result<Value, ApiError> {
        let mut state = self.state();
        state.calls.push(ApiCall::CreateBooking(request.clone()));
        if let Some(err) = state.take_control_failure() {
            return Err(err);
        }
        state.next_booking += 1;
        Ok(json!({"id": state.next_booking, "run_id": request.run_id, "status": "pending"}))
    }
}
