//! The client aggregate.
//!
//! [`Client`] owns every piece of session state: the connection manager, the
//! router and its id generator, the log buffer, the poll reconciler and the
//! control state. A runtime feeds it [`ClientEvent`]s one at a time and
//! executes the [`ClientAction`]s it returns. Handlers run to completion, so
//! no state is ever observed half-updated.
//!
//! Once stopped, the client ignores everything except the two purely local
//! user actions (clearing the log and dismissing an error). Timers that fire
//! and requests that complete after teardown therefore change nothing.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::Value;
use slotwatch_proto::{BookingRequest, MonitorConfig, StartMonitorRequest};
use tracing::{debug, info};

use crate::{
    ClientError, ConnectionId, ConnectionManager, ConnectionState, ControlCommand, ControlFailure,
    ControlKind, ControlRequest, ControlSuccess, Controls, Environment, EventRouter, LogBuffer,
    LogEntry, MonitorSnapshot, PollOutcome, PollReconciler, PollResponse, PollSeq, ReconnectPolicy,
    TimerId,
    connection::ConnectionAction,
    entry::kind,
    log_buffer::DEFAULT_CAPACITY,
    poll::POLL_FAILED_MESSAGE,
};

/// Shown when a booking is requested without a run to book for.
pub const NO_ACTIVE_MONITOR: &str = "No active monitor found";

/// Client tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Push channel retry policy
    pub reconnect: ReconnectPolicy,
    /// Time between poll cycles
    pub poll_interval: Duration,
    /// Time between heartbeat pings; `None` disables them
    pub heartbeat_interval: Option<Duration>,
    /// Log entries retained
    pub log_capacity: usize,
    /// Flow passed when starting a monitor
    pub monitor_flow: String,
    /// Worker check interval passed when starting a monitor
    pub check_interval_secs: u64,
    /// `form_data` sent with a booking
    pub booking_form: Value,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            poll_interval: Duration::from_secs(10),
            heartbeat_interval: Some(Duration::from_secs(30)),
            log_capacity: DEFAULT_CAPACITY,
            monitor_flow: "mozambique-to-portugal".to_string(),
            check_interval_secs: 60,
            booking_form: Value::Object(serde_json::Map::new()),
        }
    }
}

impl ClientConfig {
    /// Reject configurations the client cannot run with.
    pub fn validate(&self) -> Result<(), ClientError> {
        self.reconnect.validate()?;
        if self.poll_interval.is_zero() {
            return Err(ClientError::InvalidConfig {
                field: "poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.heartbeat_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(ClientError::InvalidConfig {
                field: "heartbeat_interval",
                reason: "must be greater than zero when set".to_string(),
            });
        }
        if self.log_capacity == 0 {
            return Err(ClientError::InvalidConfig {
                field: "log_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.monitor_flow.trim().is_empty() {
            return Err(ClientError::InvalidConfig {
                field: "monitor_flow",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.booking_form.is_object() {
            return Err(ClientError::InvalidConfig {
                field: "booking_form",
                reason: "must be a JSON object".to_string(),
            });
        }
        Ok(())
    }
}

/// Inputs to the client: user intent and I/O completions.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Begin syncing: connect and start polling
    Start,
    /// Tear down for the rest of the session
    Stop,
    /// Manual reconnect, typically after `Failed`
    Restart,
    /// Periodic housekeeping
    Tick,
    /// Handshake for this attempt succeeded
    ConnectionOpened(ConnectionId),
    /// Handshake for this attempt failed
    ConnectionFailed {
        /// Attempt that failed
        conn: ConnectionId,
        /// Transport error text
        reason: String,
    },
    /// Socket closed without being asked to
    ConnectionClosed {
        /// Attempt that closed
        conn: ConnectionId,
        /// Close code, when the peer sent one
        code: Option<u16>,
    },
    /// Text payload read from a socket
    FrameReceived {
        /// Attempt the frame arrived on
        conn: ConnectionId,
        /// Raw payload
        payload: String,
    },
    /// Reconnect timer fired
    ReconnectTimerFired(TimerId),
    /// Poll interval elapsed
    PollTimerFired,
    /// Poll cycle finished
    PollCompleted {
        /// Cycle that finished
        seq: PollSeq,
        /// Both fetches, or the first failure
        result: Result<PollResponse, String>,
    },
    /// User asked for a control
    Control(ControlRequest),
    /// In-flight control finished
    ControlCompleted(Result<ControlSuccess, ControlFailure>),
    /// User cleared the log
    ClearLog,
    /// User dismissed the current error
    DismissError,
}

/// Effects for the runtime to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Open a push socket for this attempt
    OpenConnection(ConnectionId),
    /// Close this attempt's socket
    CloseConnection(ConnectionId),
    /// Send a `"ping"` on this attempt's socket
    SendHeartbeat(ConnectionId),
    /// Arm a reconnect timer
    ScheduleReconnect {
        /// Identity reported back on firing
        timer: TimerId,
        /// Delay before firing
        delay: Duration,
    },
    /// Disarm a reconnect timer
    CancelReconnect(TimerId),
    /// Fire `PollTimerFired` every `interval`
    StartPollTimer {
        /// Poll period
        interval: Duration,
    },
    /// Stop the poll timer
    StopPollTimer,
    /// Run one poll cycle (both fetches concurrently)
    IssuePoll(PollSeq),
    /// Send a control request
    SendControl(ControlCommand),
    /// The view changed
    Render,
}

/// Immutable view handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientView {
    /// Push channel state
    pub connection: ConnectionState,
    /// Status line for `connection`
    pub status_label: String,
    /// Retained log, newest first
    pub logs: Vec<LogEntry>,
    /// Latest applied snapshot
    pub snapshot: Option<Arc<MonitorSnapshot>>,
    /// Whether a monitor is running
    pub is_monitoring: bool,
    /// Controls currently offered
    pub controls: Controls,
    /// Whether a control request is in flight
    pub busy: bool,
    /// Error awaiting dismissal
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    NotStarted,
    Running,
    Stopped,
}

/// Synchronization client for one dashboard session.
pub struct Client<E: Environment> {
    env: E,
    config: ClientConfig,
    manager: ConnectionManager,
    router: EventRouter,
    buffer: LogBuffer,
    reconciler: PollReconciler,
    in_flight: Option<ControlKind>,
    last_error: Option<String>,
    lifecycle: Lifecycle,
}

impl<E: Environment> Client<E> {
    /// Create a client. The entry id nonce is drawn from `env`.
    pub fn new(env: E, config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let instance = env.random_u32();
        Ok(Self {
            manager: ConnectionManager::new(config.reconnect, config.heartbeat_interval),
            router: EventRouter::new(instance),
            buffer: LogBuffer::new(config.log_capacity),
            reconciler: PollReconciler::new(),
            in_flight: None,
            last_error: None,
            lifecycle: Lifecycle::NotStarted,
            env,
            config,
        })
    }

    /// Configuration in force.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Push channel state.
    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Retained log.
    pub fn log(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Latest applied snapshot.
    pub fn snapshot(&self) -> Option<Arc<MonitorSnapshot>> {
        self.reconciler.snapshot()
    }

    /// Whether `Stop` has been handled.
    pub fn is_stopped(&self) -> bool {
        self.lifecycle == Lifecycle::Stopped
    }

    /// Controls currently offered.
    pub fn controls(&self) -> Controls {
        Controls::derive(self.in_flight.is_some(), self.reconciler.is_monitoring())
    }

    /// Build an owned view of the current state.
    pub fn view(&self) -> ClientView {
        ClientView {
            connection: self.manager.state(),
            status_label: self.manager.status_label(),
            logs: self.buffer.snapshot(),
            snapshot: self.reconciler.snapshot(),
            is_monitoring: self.reconciler.is_monitoring(),
            controls: self.controls(),
            busy: self.in_flight.is_some(),
            last_error: self.last_error.clone(),
        }
    }

    /// Process one event.
    pub fn handle(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        if self.lifecycle == Lifecycle::Stopped {
            return match event {
                ClientEvent::ClearLog => self.clear_log(),
                ClientEvent::DismissError => self.dismiss_error(),
                other => {
                    debug!(event = ?other, "client stopped, ignoring event");
                    Vec::new()
                },
            };
        }

        match event {
            ClientEvent::Start => self.start(),
            ClientEvent::Stop => self.stop(),
            ClientEvent::Restart => self.restart(),
            ClientEvent::ClearLog => self.clear_log(),
            ClientEvent::DismissError => self.dismiss_error(),
            other if self.lifecycle == Lifecycle::NotStarted => {
                debug!(event = ?other, "client not started, ignoring event");
                Vec::new()
            },
            ClientEvent::Tick => {
                let now = self.env.now();
                let actions = self.manager.tick(now);
                self.apply_connection(actions)
            },
            ClientEvent::ConnectionOpened(conn) => {
                let now = self.env.now();
                let actions = self.manager.handshake_succeeded(conn, now);
                self.apply_connection(actions)
            },
            ClientEvent::ConnectionFailed { conn, reason } => {
                let actions = self.manager.handshake_failed(conn, &reason);
                self.apply_connection(actions)
            },
            ClientEvent::ConnectionClosed { conn, code } => {
                let actions = self.manager.connection_closed(conn, code);
                self.apply_connection(actions)
            },
            ClientEvent::ReconnectTimerFired(timer) => {
                let actions = self.manager.reconnect_timer_fired(timer);
                self.apply_connection(actions)
            },
            ClientEvent::FrameReceived { conn, payload } => self.frame_received(conn, &payload),
            ClientEvent::PollTimerFired => vec![ClientAction::IssuePoll(self.reconciler.issue())],
            ClientEvent::PollCompleted { seq, result } => self.poll_completed(seq, result),
            ClientEvent::Control(request) => self.control(request),
            ClientEvent::ControlCompleted(result) => self.control_completed(result),
        }
    }

    fn start(&mut self) -> Vec<ClientAction> {
        if self.lifecycle != Lifecycle::NotStarted {
            return Vec::new();
        }
        info!("starting synchronization");
        self.lifecycle = Lifecycle::Running;

        let connection = self.manager.start();
        let mut actions = self.apply_connection(connection);
        actions.push(ClientAction::StartPollTimer { interval: self.config.poll_interval });
        actions.push(ClientAction::IssuePoll(self.reconciler.issue()));
        actions
    }

    fn restart(&mut self) -> Vec<ClientAction> {
        if self.lifecycle == Lifecycle::NotStarted {
            return self.start();
        }
        let connection = self.manager.restart();
        self.apply_connection(connection)
    }

    fn stop(&mut self) -> Vec<ClientAction> {
        info!("stopping synchronization");
        let was_running = self.lifecycle == Lifecycle::Running;
        self.lifecycle = Lifecycle::Stopped;
        self.in_flight = None;

        let connection = self.manager.stop();
        let mut actions = self.apply_connection(connection);
        if was_running {
            actions.push(ClientAction::StopPollTimer);
        }
        push_render(&mut actions);
        actions
    }

    fn clear_log(&mut self) -> Vec<ClientAction> {
        self.buffer.clear();
        vec![ClientAction::Render]
    }

    fn dismiss_error(&mut self) -> Vec<ClientAction> {
        if self.last_error.take().is_some() { vec![ClientAction::Render] } else { Vec::new() }
    }

    fn frame_received(&mut self, conn: ConnectionId, payload: &str) -> Vec<ClientAction> {
        if !self.manager.frame_allowed(conn) {
            debug!(%conn, "dropping frame outside open connection");
            return Vec::new();
        }
        let received_at = self.env.wall_clock();
        match self.router.route(payload, received_at).into_entry() {
            Some(entry) => {
                debug!(kind = entry.event_kind(), "push event");
                self.buffer.append(entry);
                vec![ClientAction::Render]
            },
            None => Vec::new(),
        }
    }

    fn poll_completed(
        &mut self,
        seq: PollSeq,
        result: Result<PollResponse, String>,
    ) -> Vec<ClientAction> {
        let fetched_at = self.env.wall_clock();
        match self.reconciler.complete(seq, result, fetched_at) {
            PollOutcome::Applied(_) => vec![ClientAction::Render],
            PollOutcome::Failed { .. } => {
                self.log_synthetic(kind::ERROR, POLL_FAILED_MESSAGE);
                vec![ClientAction::Render]
            },
            PollOutcome::Stale { .. } | PollOutcome::Ignored => Vec::new(),
        }
    }

    fn control(&mut self, request: ControlRequest) -> Vec<ClientAction> {
        if self.in_flight.is_some() {
            debug!(?request, "control already in flight");
            return Vec::new();
        }

        let command = match self.build_command(request) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(?request, "control not offered");
                return Vec::new();
            },
            Err(message) => {
                self.log_synthetic(kind::ERROR, format!("{message} for booking"));
                self.last_error = Some(message.to_string());
                return vec![ClientAction::Render];
            },
        };

        info!(?request, "sending control");
        self.in_flight = Some(command.kind());
        self.last_error = None;
        vec![ClientAction::SendControl(command), ClientAction::Render]
    }

    /// `Ok(None)` when the control is not offered; `Err` for a booking with
    /// nothing to book.
    fn build_command(
        &self,
        request: ControlRequest,
    ) -> Result<Option<ControlCommand>, &'static str> {
        let snapshot = self.reconciler.snapshot();
        let active = snapshot.as_ref().and_then(|s| s.active_monitor.as_ref());

        match request {
            ControlRequest::TriggerBooking => {
                let Some((monitor, run_id)) =
                    active.and_then(|m| m.run_id.as_ref().map(|run_id| (m, run_id)))
                else {
                    return Err(NO_ACTIVE_MONITOR);
                };
                Ok(Some(ControlCommand::TriggerBooking(BookingRequest {
                    applicant_id: monitor.applicant_id.clone().unwrap_or_default(),
                    run_id: run_id.clone(),
                    form_data: self.config.booking_form.clone(),
                })))
            },
            _ if !self.controls().permits(request) => Ok(None),
            ControlRequest::StartMonitor => {
                let millis = self.env.wall_clock().timestamp_millis();
                Ok(Some(ControlCommand::StartMonitor(StartMonitorRequest {
                    flow: self.config.monitor_flow.clone(),
                    applicant_id: Some(format!("user_{millis}")),
                    config: Some(MonitorConfig { check_interval: self.config.check_interval_secs }),
                })))
            },
            ControlRequest::StopMonitor => {
                Ok(active.map(|monitor| ControlCommand::StopMonitor { monitor_id: monitor.id }))
            },
        }
    }

    fn control_completed(
        &mut self,
        result: Result<ControlSuccess, ControlFailure>,
    ) -> Vec<ClientAction> {
        let Some(kind) = self.in_flight.take() else {
            debug!("control completion with nothing in flight");
            return Vec::new();
        };

        let mut actions = Vec::new();
        match result {
            Ok(success) => {
                info!(?success, "control succeeded");
                self.log_synthetic(success.entry_kind(), success.message());
                if success.refreshes_status() {
                    actions.push(ClientAction::IssuePoll(self.reconciler.issue()));
                }
            },
            Err(failure) => {
                let message = failure.message(kind);
                info!(%message, "control failed");
                self.log_synthetic(kind::ERROR, message.clone());
                self.last_error = Some(message);
            },
        }
        actions.push(ClientAction::Render);
        actions
    }

    fn apply_connection(&mut self, connection: Vec<ConnectionAction>) -> Vec<ClientAction> {
        let mut actions = Vec::with_capacity(connection.len() + 1);
        let mut changed = false;
        for action in connection {
            match action {
                ConnectionAction::Open(conn) => actions.push(ClientAction::OpenConnection(conn)),
                ConnectionAction::Close(conn) => actions.push(ClientAction::CloseConnection(conn)),
                ConnectionAction::ScheduleReconnect { timer, delay } => {
                    actions.push(ClientAction::ScheduleReconnect { timer, delay });
                },
                ConnectionAction::CancelReconnect(timer) => {
                    actions.push(ClientAction::CancelReconnect(timer));
                },
                ConnectionAction::SendHeartbeat(conn) => {
                    actions.push(ClientAction::SendHeartbeat(conn));
                },
                ConnectionAction::Transition(transition) => {
                    self.log_synthetic(transition.entry_kind(), transition.reason);
                    changed = true;
                },
            }
        }
        if changed {
            push_render(&mut actions);
        }
        actions
    }

    fn log_synthetic(&mut self, event_kind: &str, message: impl Into<String>) {
        let at = self.env.wall_clock();
        let entry = self.router.synthetic(event_kind, message, at);
        self.buffer.append(entry);
    }
}

fn push_render(actions: &mut Vec<ClientAction>) {
    if !actions.contains(&ClientAction::Render) {
        actions.push(ClientAction::Render);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicU32, Ordering},
        },
        time::Instant,
    };

    use chrono::{DateTime, TimeZone, Utc};
    use slotwatch_proto::{ActiveMonitor, MonitorStatusResponse, MonitorSummary};

    use super::*;

    #[derive(Clone)]
    struct TestEnv {
        start: Instant,
        offset_ms: Arc<Mutex<u64>>,
        counter: Arc<AtomicU32>,
    }

    impl TestEnv {
        fn new() -> Self {
            Self { start: Instant::now(), offset_ms: Arc::default(), counter: Arc::default() }
        }

        fn advance(&self, by: Duration) {
            *self.offset_ms.lock().unwrap() += by.as_millis() as u64;
        }

        fn offset(&self) -> Duration {
            Duration::from_millis(*self.offset_ms.lock().unwrap())
        }
    }

    impl Environment for TestEnv {
        fn now(&self) -> Instant {
            self.start + self.offset()
        }

        fn wall_clock(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
                + chrono::Duration::from_std(self.offset()).unwrap()
        }

        async fn sleep(&self, _duration: Duration) {}

        fn random_bytes(&self, buffer: &mut [u8]) {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = (n as u8).wrapping_add(i as u8);
            }
        }
    }

    fn client() -> (Client<TestEnv>, TestEnv) {
        let env = TestEnv::new();
        (Client::new(env.clone(), ClientConfig::default()).unwrap(), env)
    }

    fn open_conn(actions: &[ClientAction]) -> ConnectionId {
        actions
            .iter()
            .find_map(|a| match a {
                ClientAction::OpenConnection(conn) => Some(*conn),
                _ => None,
            })
            .expect("open connection action")
    }

    fn poll_seq(actions: &[ClientAction]) -> PollSeq {
        actions
            .iter()
            .find_map(|a| match a {
                ClientAction::IssuePoll(seq) => Some(*seq),
                _ => None,
            })
            .expect("issue poll action")
    }

    fn sent_control(actions: &[ClientAction]) -> Option<&ControlCommand> {
        actions.iter().find_map(|a| match a {
            ClientAction::SendControl(command) => Some(command),
            _ => None,
        })
    }

    fn frame(conn: ConnectionId, payload: &str) -> ClientEvent {
        ClientEvent::FrameReceived { conn, payload: payload.to_string() }
    }

    fn refused(conn: ConnectionId) -> ClientEvent {
        ClientEvent::ConnectionFailed { conn, reason: "refused".to_string() }
    }

    fn polled(seq: PollSeq, active: Option<ActiveMonitor>) -> ClientEvent {
        ClientEvent::PollCompleted { seq, result: Ok(status_with(active)) }
    }

    fn started() -> (Client<TestEnv>, TestEnv, ConnectionId, PollSeq) {
        let (mut client, env) = client();
        let actions = client.handle(ClientEvent::Start);
        let conn = open_conn(&actions);
        let seq = poll_seq(&actions);
        (client, env, conn, seq)
    }

    fn status_with(active: Option<ActiveMonitor>) -> PollResponse {
        let status = match &active {
            Some(monitor) => MonitorStatusResponse::with_active(monitor),
            None => MonitorStatusResponse::idle(),
        };
        let monitors = active
            .iter()
            .map(|m| MonitorSummary {
                id: m.id,
                flow: "mozambique-to-portugal".into(),
                status: "active".into(),
                created_at: None,
                applicant_id: m.applicant_id.clone(),
                run_id: m.run_id.clone(),
            })
            .collect();
        PollResponse { monitors, status }
    }

    fn monitor(run_id: Option<&str>) -> ActiveMonitor {
        ActiveMonitor {
            id: 7,
            applicant_id: Some("user_1".into()),
            run_id: run_id.map(str::to_string),
            status: Some("active".into()),
        }
    }

    fn kinds(client: &Client<TestEnv>) -> Vec<String> {
        client.log().iter().map(|e| e.event_kind().to_string()).collect()
    }

    #[test]
    fn start_connects_and_polls_immediately() {
        let (mut client, _env) = client();
        let actions = client.handle(ClientEvent::Start);

        let interval = Duration::from_secs(10);
        assert!(actions.contains(&ClientAction::StartPollTimer { interval }));
        open_conn(&actions);
        poll_seq(&actions);
        assert_eq!(client.view().status_label, "Connecting...");
        assert!(client.handle(ClientEvent::Start).is_empty());
    }

    #[test]
    fn events_before_start_are_ignored() {
        let (mut client, _env) = client();
        assert!(client.handle(ClientEvent::PollTimerFired).is_empty());
        assert!(client.handle(ClientEvent::Control(ControlRequest::StartMonitor)).is_empty());
        assert!(client.log().is_empty());
    }

    #[test]
    fn push_scenario_keeps_one_event_and_schedules_retry() {
        let (mut client, _env, conn, _) = started();
        client.handle(ClientEvent::ConnectionOpened(conn));
        assert_eq!(client.connection_state(), ConnectionState::Open);

        client.handle(frame(
            conn,
            r#"{"event":"monitor_started","message":"started","timestamp":"2024-01-01T00:00:00Z"}"#,
        ));
        assert!(client.handle(frame(conn, r#"{"event":"pong"}"#)).is_empty());
        let actions = client.handle(ClientEvent::ConnectionClosed { conn, code: Some(1006) });

        assert_eq!(client.connection_state(), ConnectionState::Reconnecting(1));
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::ScheduleReconnect { delay, .. } if *delay == Duration::from_millis(1000)
        )));

        let pushed: Vec<&LogEntry> =
            client.log().iter().filter(|e| e.event_kind() == "monitor_started").collect();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].message(), "started");
        assert!(!kinds(&client).iter().any(|k| k == "pong"));
        assert_eq!(kinds(&client), ["reconnecting", "monitor_started", "connection", "connecting"]);
    }

    #[test]
    fn frames_outside_open_are_dropped() {
        let (mut client, _env, conn, _) = started();
        let before = client.log().len();
        let actions = client.handle(frame(conn, r#"{"event":"x","message":"y"}"#));
        assert!(actions.is_empty());
        assert_eq!(client.log().len(), before);
    }

    #[test]
    fn malformed_frame_logs_once_and_keeps_connection() {
        let (mut client, _env, conn, _) = started();
        client.handle(ClientEvent::ConnectionOpened(conn));
        client.handle(ClientEvent::FrameReceived { conn, payload: "{oops".into() });

        assert_eq!(client.connection_state(), ConnectionState::Open);
        let latest = client.log().latest().unwrap();
        assert_eq!(latest.event_kind(), kind::ERROR);
        assert_eq!(latest.message(), "malformed message");
    }

    #[test]
    fn five_failed_reconnects_end_in_failed() {
        let (mut client, _env, mut conn, _) = started();
        for _ in 0..5 {
            let actions = client.handle(refused(conn));
            let timer = actions
                .iter()
                .find_map(|a| match a {
                    ClientAction::ScheduleReconnect { timer, .. } => Some(*timer),
                    _ => None,
                })
                .unwrap();
            conn = open_conn(&client.handle(ClientEvent::ReconnectTimerFired(timer)));
        }
        let actions = client.handle(refused(conn));

        assert_eq!(client.connection_state(), ConnectionState::Failed);
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::ScheduleReconnect { .. })));
        let latest = client.log().latest().unwrap();
        assert!(latest.message().ends_with("Max reconnection attempts reached"));
        assert_eq!(client.view().status_label, "Connection Failed");

        let actions = client.handle(ClientEvent::Restart);
        open_conn(&actions);
        assert_eq!(client.connection_state(), ConnectionState::Connecting);
    }

    #[test]
    fn stale_poll_is_discarded() {
        let (mut client, _env, _conn, k) = started();
        let k1 = poll_seq(&client.handle(ClientEvent::PollTimerFired));

        client.handle(polled(k1, Some(monitor(Some("run-1")))));
        let actions = client.handle(polled(k, None));

        assert!(actions.is_empty());
        assert!(client.view().is_monitoring);
        assert_eq!(client.snapshot().unwrap().seq, k1);
    }

    #[test]
    fn stale_poll_failure_is_not_logged() {
        let (mut client, _env, _conn, k) = started();
        let k1 = poll_seq(&client.handle(ClientEvent::PollTimerFired));
        client.handle(polled(k1, None));
        let before = client.log().len();

        let actions =
            client.handle(ClientEvent::PollCompleted { seq: k, result: Err("timeout".into()) });

        assert!(actions.is_empty());
        assert_eq!(client.log().len(), before);
        assert!(!kinds(&client).iter().any(|entry_kind| entry_kind == "error"));
    }

    #[test]
    fn poll_failure_keeps_snapshot_and_logs() {
        let (mut client, _env, _conn, k) = started();
        client.handle(polled(k, Some(monitor(None))));
        let k1 = poll_seq(&client.handle(ClientEvent::PollTimerFired));
        client.handle(ClientEvent::PollCompleted { seq: k1, result: Err("timeout".into()) });

        assert!(client.view().is_monitoring);
        assert_eq!(client.log().latest().unwrap().message(), "Failed to load monitor data");
        assert_eq!(client.connection_state(), ConnectionState::Connecting);
    }

    #[test]
    fn stop_makes_late_completions_no_ops() {
        let (mut client, env, conn, k) = started();
        client.handle(ClientEvent::ConnectionOpened(conn));
        let actions = client.handle(ClientEvent::Stop);
        assert!(actions.contains(&ClientAction::CloseConnection(conn)));
        assert!(actions.contains(&ClientAction::StopPollTimer));

        let before = client.view();
        env.advance(Duration::from_secs(60));
        let late = [
            ClientEvent::PollCompleted { seq: k, result: Ok(status_with(Some(monitor(None)))) },
            ClientEvent::PollTimerFired,
            ClientEvent::ConnectionClosed { conn, code: Some(1006) },
            ClientEvent::FrameReceived { conn, payload: r#"{"event":"a","message":"b"}"#.into() },
            ClientEvent::ReconnectTimerFired(TimerId(0)),
            ClientEvent::ControlCompleted(Ok(ControlSuccess::MonitorStopped)),
            ClientEvent::Tick,
            ClientEvent::Start,
            ClientEvent::Restart,
            ClientEvent::Stop,
        ];
        for event in late {
            assert!(client.handle(event).is_empty());
        }
        assert_eq!(client.view(), before);
        assert!(client.is_stopped());
    }

    #[test]
    fn start_monitor_round_trip() {
        let (mut client, _env, _conn, k) = started();
        client.handle(polled(k, None));
        assert!(client.controls().can_start);

        let actions = client.handle(ClientEvent::Control(ControlRequest::StartMonitor));
        let Some(ControlCommand::StartMonitor(request)) = sent_control(&actions) else {
            panic!("expected start request");
        };
        assert_eq!(request.flow, "mozambique-to-portugal");
        assert_eq!(request.applicant_id.as_deref(), Some("user_1717243200000"));
        assert_eq!(request.config, Some(MonitorConfig { check_interval: 60 }));
        assert!(client.view().busy);
        assert_eq!(client.controls(), Controls::default());
        assert!(client.handle(ClientEvent::Control(ControlRequest::StartMonitor)).is_empty());

        let success = ControlSuccess::MonitorStarted { monitor_id: 9 };
        let actions = client.handle(ClientEvent::ControlCompleted(Ok(success)));
        poll_seq(&actions);
        assert!(!client.view().busy);
        assert_eq!(client.log().latest().unwrap().message(), "Monitor 9 started successfully");
    }

    #[test]
    fn stop_monitor_uses_active_id() {
        let (mut client, _env, _conn, k) = started();
        client.handle(polled(k, Some(monitor(Some("run-1")))));

        let actions = client.handle(ClientEvent::Control(ControlRequest::StopMonitor));
        assert_eq!(sent_control(&actions), Some(&ControlCommand::StopMonitor { monitor_id: 7 }));
        assert!(client.handle(ClientEvent::Control(ControlRequest::StartMonitor)).is_empty());
    }

    #[test]
    fn booking_without_run_id_sends_nothing() {
        let (mut client, _env, _conn, k) = started();
        client.handle(polled(k, Some(monitor(None))));

        let actions = client.handle(ClientEvent::Control(ControlRequest::TriggerBooking));
        assert!(sent_control(&actions).is_none());
        let view = client.view();
        assert_eq!(view.last_error.as_deref(), Some("No active monitor found"));
        assert!(!view.busy);
        assert_eq!(client.log().latest().unwrap().event_kind(), kind::ERROR);

        client.handle(ClientEvent::DismissError);
        assert_eq!(client.view().last_error, None);
    }

    #[test]
    fn booking_sends_run_and_form() {
        let (mut client, _env, _conn, k) = started();
        client.handle(polled(k, Some(monitor(Some("run-1")))));

        let actions = client.handle(ClientEvent::Control(ControlRequest::TriggerBooking));
        let Some(ControlCommand::TriggerBooking(request)) = sent_control(&actions) else {
            panic!("expected booking request");
        };
        assert_eq!(request.run_id, "run-1");
        assert_eq!(request.applicant_id, "user_1");

        let actions =
            client.handle(ClientEvent::ControlCompleted(Ok(ControlSuccess::BookingTriggered)));
        assert_eq!(actions, vec![ClientAction::Render]);
        assert_eq!(client.log().latest().unwrap().event_kind(), kind::BOOKING_TRIGGERED);
    }

    #[test]
    fn control_failure_surfaces_detail_or_default() {
        let (mut client, _env, _conn, k) = started();
        client.handle(polled(k, None));

        client.handle(ClientEvent::Control(ControlRequest::StartMonitor));
        let failure = ControlFailure::with_detail("Monitor already running");
        client.handle(ClientEvent::ControlCompleted(Err(failure)));
        assert_eq!(client.view().last_error.as_deref(), Some("Monitor already running"));

        client.handle(ClientEvent::Control(ControlRequest::StartMonitor));
        assert_eq!(client.view().last_error, None);
        client.handle(ClientEvent::ControlCompleted(Err(ControlFailure::default())));
        assert_eq!(client.view().last_error.as_deref(), Some("Failed to start monitoring"));
    }

    #[test]
    fn clear_log_is_user_only() {
        let (mut client, _env, conn, _) = started();
        client.handle(ClientEvent::ConnectionOpened(conn));
        client.handle(ClientEvent::ConnectionClosed { conn, code: Some(1006) });
        assert!(!client.log().is_empty());

        client.handle(ClientEvent::ClearLog);
        assert!(client.log().is_empty());
    }

    #[test]
    fn heartbeat_on_tick() {
        let (mut client, env, conn, _) = started();
        client.handle(ClientEvent::ConnectionOpened(conn));
        assert!(client.handle(ClientEvent::Tick).is_empty());

        env.advance(Duration::from_secs(30));
        assert_eq!(client.handle(ClientEvent::Tick), vec![ClientAction::SendHeartbeat(conn)]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ClientConfig { poll_interval: Duration::ZERO, ..Default::default() };
        let err = Client::new(TestEnv::new(), config).err().unwrap();
        assert_eq!(err.to_string(), "invalid poll_interval: must be greater than zero");

        let config = ClientConfig { booking_form: Value::Null, ..Default::default() };
        assert!(Client::new(TestEnv::new(), config).is_err());
    }
}
