//! End-to-end scenarios for the runtime on virtual time.
//!
//! Each test drives the real [`Runtime`] with the in-memory push transport
//! and the scripted Monitor Service. Time is paused, so reconnect delays,
//! heartbeats and poll intervals elapse instantly and exactly.

use std::time::Duration;

use slotwatch_app::{Runtime, RuntimeError, RuntimeHandle};
use slotwatch_core::{ClientConfig, ClientView, ConnectionState, ControlRequest};
use slotwatch_harness::{ApiCall, PushServer, ScriptedApi, ScriptedTransport, SimEnv};
use slotwatch_proto::PushFrame;
use tokio::{task::JoinHandle, time::Instant};

struct Session {
    handle: RuntimeHandle,
    server: PushServer,
    api: ScriptedApi,
    task: JoinHandle<()>,
}

fn launch(config: ClientConfig) -> Session {
    let (transport, server) = ScriptedTransport::new();
    let api = ScriptedApi::new();
    let (runtime, handle) =
        Runtime::new(SimEnv::with_seed(7), config, transport, api.clone()).unwrap();
    let task = tokio::spawn(runtime.run());
    Session { handle, server, api, task }
}

fn kinds(view: &ClientView) -> Vec<&str> {
    view.logs.iter().map(|entry| entry.event_kind()).collect()
}

fn messages_of<'a>(view: &'a ClientView, kind: &str) -> Vec<&'a str> {
    view.logs
        .iter()
        .rev()
        .filter(|entry| entry.event_kind() == kind)
        .map(|entry| entry.message())
        .collect()
}

fn assert_elapsed(since: Instant, expected: Duration) {
    let elapsed = since.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(100),
        "expected {expected:?}, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn push_frames_then_abnormal_drop() {
    let mut s = launch(ClientConfig::default());
    s.handle.start().unwrap();

    let peer = s.server.accept().await.unwrap();
    s.handle.wait_for(|v| v.connection == ConnectionState::Open).await.unwrap();

    let started = PushFrame::new("monitor_started", "Monitor started for user_1")
        .with_timestamp("2024-06-01T12:00:00")
        .encode()
        .unwrap();
    assert!(peer.send_text(&started));
    assert!(peer.send_text(r#"{"event":"pong"}"#));
    drop(peer);

    let view =
        s.handle.wait_for(|v| v.connection == ConnectionState::Reconnecting(1)).await.unwrap();
    let dropped_at = Instant::now();

    assert_eq!(kinds(&view), vec!["reconnecting", "monitor_started", "connection", "connecting"]);
    assert_eq!(view.logs[1].message(), "Monitor started for user_1");
    assert_eq!(
        view.logs[0].message(),
        "Connection closed (code 1006). Reconnecting in 1s (attempt 1/5)"
    );
    assert_eq!(view.status_label, "Reconnecting (1/5)...");

    let _peer = s.server.accept().await.unwrap();
    assert_elapsed(dropped_at, Duration::from_secs(1));

    let view = s.handle.wait_for(|v| v.connection == ConnectionState::Open).await.unwrap();
    assert_eq!(
        messages_of(&view, "connecting"),
        vec!["Connecting to monitoring system", "Connecting to monitoring system (attempt 1/5)"]
    );
    assert_eq!(messages_of(&view, "monitor_started").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn five_failed_reconnects_end_in_failed() {
    let mut s = launch(ClientConfig::default());
    s.server.refuse_all("connection refused");
    let started = Instant::now();
    s.handle.start().unwrap();

    let view = s.handle.wait_for(|v| v.connection == ConnectionState::Failed).await.unwrap();
    assert_elapsed(started, Duration::from_secs(1 + 2 + 4 + 8 + 16));
    assert_eq!(s.server.attempts(), 6);
    assert_eq!(view.status_label, "Connection Failed");
    assert_eq!(view.logs[0].event_kind(), "error");
    assert_eq!(
        view.logs[0].message(),
        "Connection failed (connect failed: connection refused). Max reconnection attempts reached"
    );

    let delays: Vec<&str> = messages_of(&view, "reconnecting")
        .into_iter()
        .map(|message| message.split(". ").nth(1).unwrap())
        .collect();
    assert_eq!(
        delays,
        vec![
            "Reconnecting in 1s (attempt 1/5)",
            "Reconnecting in 2s (attempt 2/5)",
            "Reconnecting in 4s (attempt 3/5)",
            "Reconnecting in 8s (attempt 4/5)",
            "Reconnecting in 16s (attempt 5/5)",
        ]
    );

    // Failed is terminal until a manual restart.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(s.server.attempts(), 6);
    assert_eq!(s.handle.view().connection, ConnectionState::Failed);

    s.server.accept_all();
    s.handle.restart().unwrap();
    let _peer = s.server.accept().await.unwrap();
    let view = s.handle.wait_for(|v| v.connection == ConnectionState::Open).await.unwrap();
    assert_eq!(messages_of(&view, "connecting").last(), Some(&"Reconnecting to monitoring system"));
}

#[tokio::test(start_paused = true)]
async fn heartbeat_ping_and_pong() {
    let mut s = launch(ClientConfig::default());
    s.handle.start().unwrap();
    let mut peer = s.server.accept().await.unwrap();
    s.handle.wait_for(|v| v.connection == ConnectionState::Open).await.unwrap();
    let opened_at = Instant::now();

    assert_eq!(peer.recv().await.as_deref(), Some("ping"));
    let first = opened_at.elapsed();
    assert!(first >= Duration::from_secs(30) && first <= Duration::from_secs(31), "{first:?}");
    assert!(peer.send_text(r#"{"event":"pong"}"#));

    assert_eq!(peer.recv().await.as_deref(), Some("ping"));
    let view = s.handle.view();
    assert!(!kinds(&view).contains(&"pong"));
    assert_eq!(view.connection, ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn stale_poll_response_is_discarded() {
    let mut s = launch(ClientConfig::default());
    s.api.delay_next_list(Duration::from_secs(15));
    let started = Instant::now();
    s.handle.start().unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let monitor_id = s.api.start_external("user_9");

    // Second cycle (t=10s) sees the new monitor and is applied first.
    let view = s.handle.wait_for(|v| v.is_monitoring).await.unwrap();
    assert_elapsed(started, Duration::from_secs(10));
    let applied = view.snapshot.as_ref().unwrap().seq;

    // First cycle completes at t=15s with the older, empty listing.
    tokio::time::sleep_until(started + Duration::from_secs(16)).await;
    let view = s.handle.view();
    let snapshot = view.snapshot.as_ref().unwrap();
    assert_eq!(snapshot.seq, applied);
    assert_eq!(snapshot.active_monitor.as_ref().unwrap().id, monitor_id);
    assert_eq!(snapshot.stats().total, 1);
    assert!(view.is_monitoring);

    let lists = s.api.calls().iter().filter(|call| **call == ApiCall::ListMonitors).count();
    assert_eq!(lists, 2);
}

#[tokio::test(start_paused = true)]
async fn polling_is_independent_of_push_health() {
    let mut s = launch(ClientConfig::default());
    s.server.refuse_all("connection refused");
    s.api.set_reads_failing(true);
    s.api.start_external("user_3");
    s.handle.start().unwrap();

    let view = s
        .handle
        .wait_for(|v| v.logs.iter().any(|e| e.message() == "Failed to load monitor data"))
        .await
        .unwrap();
    assert!(view.snapshot.is_none());

    s.api.set_reads_failing(false);
    let view = s.handle.wait_for(|v| v.is_monitoring).await.unwrap();
    assert!(matches!(view.connection, ConnectionState::Reconnecting(_)));
    assert_eq!(view.snapshot.as_ref().unwrap().stats().active, 1);
}

#[tokio::test(start_paused = true)]
async fn monitor_stopped_elsewhere_shows_on_next_poll() {
    let mut s = launch(ClientConfig::default());
    s.api.start_external("user_4");
    s.handle.start().unwrap();
    let view = s.handle.wait_for(|v| v.is_monitoring).await.unwrap();
    assert!(view.controls.can_stop);
    let applied_at = Instant::now();

    s.api.stop_external();
    let view = s.handle.wait_for(|v| !v.is_monitoring).await.unwrap();
    assert_elapsed(applied_at, Duration::from_secs(10));
    assert!(view.controls.can_start);
    assert_eq!(view.snapshot.as_ref().unwrap().stats().active, 0);
}

#[tokio::test(start_paused = true)]
async fn stop_is_final() {
    let mut s = launch(ClientConfig::default());
    s.handle.start().unwrap();
    let mut peer = s.server.accept().await.unwrap();
    s.handle.wait_for(|v| v.connection == ConnectionState::Open).await.unwrap();

    s.handle.stop().unwrap();
    s.task.await.unwrap();

    let view = s.handle.view();
    assert_eq!(view.connection, ConnectionState::Closed);
    assert_eq!(view.status_label, "Disconnected");
    assert_eq!(view.logs[0].event_kind(), "disconnection");
    assert_eq!(view.logs[0].message(), "Connection closed");

    // The socket is closed gracefully.
    assert_eq!(peer.recv().await, None);

    // Timers and late completions have nowhere to go.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(s.handle.view(), view);
    assert_eq!(s.handle.stop(), Err(RuntimeError::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn booking_without_run_id_sends_nothing() {
    let mut s = launch(ClientConfig::default());
    s.api.start_without_run("user_1");
    s.handle.start().unwrap();
    s.handle.wait_for(|v| v.is_monitoring).await.unwrap();

    s.handle.control(ControlRequest::TriggerBooking).unwrap();
    let view = s.handle.wait_for(|v| v.last_error.is_some()).await.unwrap();

    assert_eq!(view.last_error.as_deref(), Some("No active monitor found"));
    assert_eq!(view.logs[0].message(), "No active monitor found for booking");
    assert!(s.api.control_calls().is_empty());

    s.handle.dismiss_error().unwrap();
    let view = s.handle.wait_for(|v| v.last_error.is_none()).await.unwrap();
    assert!(view.controls.can_stop);
}

#[tokio::test(start_paused = true)]
async fn monitor_controls_round_trip() {
    let mut s = launch(ClientConfig::default());
    s.handle.start().unwrap();
    let view = s.handle.wait_for(|v| v.snapshot.is_some()).await.unwrap();
    assert!(view.controls.can_start);

    s.handle.control(ControlRequest::StartMonitor).unwrap();
    let view = s.handle.wait_for(|v| v.is_monitoring).await.unwrap();
    assert_eq!(messages_of(&view, "monitor_started"), vec!["Monitor 1 started successfully"]);
    let Some(ApiCall::StartMonitor(request)) = s.api.control_calls().first().cloned() else {
        panic!("expected a start request");
    };
    assert_eq!(request.flow, "mozambique-to-portugal");
    assert!(request.applicant_id.unwrap().starts_with("user_"));
    assert_eq!(request.config.unwrap().check_interval, 60);

    s.handle.control(ControlRequest::TriggerBooking).unwrap();
    let view = s
        .handle
        .wait_for(|v| !v.busy && v.logs.iter().any(|e| e.event_kind() == "booking_triggered"))
        .await
        .unwrap();
    assert!(view.last_error.is_none());
    assert!(matches!(
        s.api.control_calls().last(),
        Some(ApiCall::CreateBooking(booking)) if booking.run_id == "run_1"
    ));

    s.api.fail_next_control(400, Some("Worker busy"));
    s.handle.control(ControlRequest::StopMonitor).unwrap();
    let view = s.handle.wait_for(|v| v.last_error.is_some()).await.unwrap();
    assert_eq!(view.last_error.as_deref(), Some("Worker busy"));
    assert!(view.is_monitoring);

    s.handle.control(ControlRequest::StopMonitor).unwrap();
    let view = s.handle.wait_for(|v| !v.is_monitoring).await.unwrap();
    assert!(view.last_error.is_none());
    assert_eq!(messages_of(&view, "monitor_stopped"), vec!["Monitoring stopped successfully"]);
    assert!(s.api.active().is_none());
}
