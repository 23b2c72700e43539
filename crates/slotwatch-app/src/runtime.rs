//! Generic runtime.
//!
//! [`Runtime`] owns the [`Client`] and is the only code that mutates it. It
//! runs on a single task: every I/O operation is spawned separately and
//! reports back through one event channel, so the client sees a strictly
//! sequential stream of events and needs no locking.
//!
//! ```text
//!   RuntimeHandle ──┐
//!   reader tasks ───┤                       ┌─> spawn connect/reader
//!   poll tasks ─────┼─> events ─> Client ───┼─> spawn poll (2 fetches)
//!   timers ─────────┘              │        ├─> spawn control request
//!                                  │        └─> arm/disarm timers
//!                                  └─> watch<ClientView>
//! ```

use std::{collections::HashMap, sync::Arc, time::Duration};

use slotwatch_core::{
    Client, ClientAction, ClientConfig, ClientError, ClientEvent, ClientView, ConnectionId,
    ControlCommand, ControlFailure, ControlRequest, ControlSuccess, Environment, PollResponse,
    PollSeq, TimerId,
};
use slotwatch_proto::HEARTBEAT_PING;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{MonitorApi, PushEvent, PushStream, PushTransport, RuntimeError};

/// How often the client gets a `Tick` for heartbeat scheduling.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outbound {
    Heartbeat,
    Close,
}

struct ConnectionTask {
    outbox: mpsc::UnboundedSender<Outbound>,
    handle: JoinHandle<()>,
}

/// Drives a [`Client`] with real (or simulated) I/O.
pub struct Runtime<E, T, A>
where
    E: Environment,
    T: PushTransport,
    A: MonitorApi,
{
    client: Client<E>,
    env: E,
    transport: Arc<T>,
    api: Arc<A>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    view_tx: watch::Sender<ClientView>,
    connections: HashMap<ConnectionId, ConnectionTask>,
    reconnect_timers: HashMap<TimerId, JoinHandle<()>>,
    poll_timer: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    requests: Vec<JoinHandle<()>>,
}

impl<E, T, A> Runtime<E, T, A>
where
    E: Environment,
    T: PushTransport,
    A: MonitorApi,
{
    /// Build a runtime and the handle used to command it.
    pub fn new(
        env: E,
        config: ClientConfig,
        transport: T,
        api: A,
    ) -> Result<(Self, RuntimeHandle), ClientError> {
        let client = Client::new(env.clone(), config)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(client.view());

        let handle = RuntimeHandle { events: events_tx.clone(), view: view_rx };
        let runtime = Self {
            client,
            env,
            transport: Arc::new(transport),
            api: Arc::new(api),
            events_tx,
            events_rx,
            view_tx,
            connections: HashMap::new(),
            reconnect_timers: HashMap::new(),
            poll_timer: None,
            ticker: None,
            requests: Vec::new(),
        };
        Ok((runtime, handle))
    }

    /// Process events until the client is stopped.
    ///
    /// Returns once `Stop` has been handled. Sockets are closed gracefully;
    /// timers and in-flight requests are aborted.
    pub async fn run(mut self) {
        self.spawn_ticker();

        while let Some(event) = self.events_rx.recv().await {
            let actions = self.client.handle(event);
            for action in actions {
                self.execute(action);
            }
            if self.client.is_stopped() {
                break;
            }
        }

        self.shutdown();
    }

    fn execute(&mut self, action: ClientAction) {
        match action {
            ClientAction::OpenConnection(conn) => self.open_connection(conn),
            ClientAction::CloseConnection(conn) => {
                if let Some(task) = self.connections.remove(&conn) {
                    let _ = task.outbox.send(Outbound::Close);
                }
            },
            ClientAction::SendHeartbeat(conn) => {
                if let Some(task) = self.connections.get(&conn) {
                    let _ = task.outbox.send(Outbound::Heartbeat);
                }
            },
            ClientAction::ScheduleReconnect { timer, delay } => {
                debug!(%timer, ?delay, "arming reconnect timer");
                let handle = self.spawn_after(delay, ClientEvent::ReconnectTimerFired(timer));
                self.reconnect_timers.retain(|_, handle| !handle.is_finished());
                self.reconnect_timers.insert(timer, handle);
            },
            ClientAction::CancelReconnect(timer) => {
                if let Some(handle) = self.reconnect_timers.remove(&timer) {
                    handle.abort();
                }
            },
            ClientAction::StartPollTimer { interval } => {
                let timer = self.spawn_every(interval, || ClientEvent::PollTimerFired);
                if let Some(previous) = self.poll_timer.replace(timer) {
                    previous.abort();
                }
            },
            ClientAction::StopPollTimer => {
                if let Some(timer) = self.poll_timer.take() {
                    timer.abort();
                }
            },
            ClientAction::IssuePoll(seq) => self.issue_poll(seq),
            ClientAction::SendControl(command) => self.send_control(command),
            ClientAction::Render => {
                self.view_tx.send_replace(self.client.view());
            },
        }
    }

    fn open_connection(&mut self, conn: ConnectionId) {
        info!(%conn, "opening push channel");
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(drive_connection(
            Arc::clone(&self.transport),
            conn,
            self.events_tx.clone(),
            outbox_rx,
        ));
        self.connections.retain(|_, task| !task.handle.is_finished());
        self.connections.insert(conn, ConnectionTask { outbox, handle });
    }

    fn issue_poll(&mut self, seq: PollSeq) {
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        self.track(tokio::spawn(async move {
            let result = tokio::try_join!(api.list_monitors(), api.monitor_status())
                .map(|(monitors, status)| PollResponse { monitors, status })
                .map_err(|err| err.to_string());
            if let Err(error) = &result {
                warn!(%seq, %error, "poll cycle failed");
            }
            let _ = events.send(ClientEvent::PollCompleted { seq, result });
        }));
    }

    fn send_control(&mut self, command: ControlCommand) {
        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        self.track(tokio::spawn(async move {
            let result = match &command {
                ControlCommand::StartMonitor(request) => api
                    .start_monitor(request)
                    .await
                    .map(|record| ControlSuccess::MonitorStarted { monitor_id: record.id }),
                ControlCommand::StopMonitor { monitor_id } => {
                    api.stop_monitor(*monitor_id).await.map(|_| ControlSuccess::MonitorStopped)
                },
                ControlCommand::TriggerBooking(request) => {
                    api.create_booking(request).await.map(|_| ControlSuccess::BookingTriggered)
                },
            };
            let result = result.map_err(|err| {
                warn!(kind = ?command.kind(), error = %err, "control request failed");
                ControlFailure { detail: err.detail() }
            });
            let _ = events.send(ClientEvent::ControlCompleted(result));
        }));
    }

    fn spawn_ticker(&mut self) {
        let ticker = self.spawn_every(TICK_INTERVAL, || ClientEvent::Tick);
        self.ticker = Some(ticker);
    }

    fn spawn_after(&self, delay: Duration, event: ClientEvent) -> JoinHandle<()> {
        let env = self.env.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            env.sleep(delay).await;
            let _ = events.send(event);
        })
    }

    fn spawn_every(&self, period: Duration, event: fn() -> ClientEvent) -> JoinHandle<()> {
        let env = self.env.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            loop {
                env.sleep(period).await;
                if events.send(event()).is_err() {
                    break;
                }
            }
        })
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.requests.retain(|handle| !handle.is_finished());
        self.requests.push(handle);
    }

    fn shutdown(&mut self) {
        info!("runtime stopped");
        for (_, timer) in self.reconnect_timers.drain() {
            timer.abort();
        }
        for timer in [self.poll_timer.take(), self.ticker.take()].into_iter().flatten() {
            timer.abort();
        }
        for request in self.requests.drain(..) {
            request.abort();
        }
        // Dropping the outboxes closes any socket still open.
        self.connections.clear();
        self.view_tx.send_replace(self.client.view());
    }
}

async fn drive_connection<T: PushTransport>(
    transport: Arc<T>,
    conn: ConnectionId,
    events: mpsc::UnboundedSender<ClientEvent>,
    mut outbox: mpsc::UnboundedReceiver<Outbound>,
) {
    let mut stream = match transport.connect().await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(%conn, error = %err, "push connect failed");
            let _ = events.send(ClientEvent::ConnectionFailed { conn, reason: err.to_string() });
            return;
        },
    };

    if events.send(ClientEvent::ConnectionOpened(conn)).is_err() {
        stream.close().await;
        return;
    }

    loop {
        tokio::select! {
            event = stream.next_event() => match event {
                PushEvent::Text(payload) => {
                    debug!(%conn, len = payload.len(), "push frame");
                    if events.send(ClientEvent::FrameReceived { conn, payload }).is_err() {
                        stream.close().await;
                        return;
                    }
                },
                PushEvent::Closed { code, reason } => {
                    warn!(%conn, ?code, %reason, "push channel closed");
                    let _ = events.send(ClientEvent::ConnectionClosed { conn, code });
                    return;
                },
            },
            outbound = outbox.recv() => match outbound {
                Some(Outbound::Heartbeat) => {
                    if let Err(err) = stream.send_text(HEARTBEAT_PING).await {
                        warn!(%conn, error = %err, "heartbeat failed");
                        stream.close().await;
                        let _ = events.send(ClientEvent::ConnectionClosed { conn, code: None });
                        return;
                    }
                },
                Some(Outbound::Close) | None => {
                    debug!(%conn, "closing push channel");
                    stream.close().await;
                    return;
                },
            },
        }
    }
}

/// Commands a running [`Runtime`] and observes its view.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    events: mpsc::UnboundedSender<ClientEvent>,
    view: watch::Receiver<ClientView>,
}

impl RuntimeHandle {
    /// Begin syncing.
    pub fn start(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::Start)
    }

    /// Stop syncing; the runtime exits after handling this.
    pub fn stop(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::Stop)
    }

    /// Manual reconnect.
    pub fn restart(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::Restart)
    }

    /// Request a monitor control.
    pub fn control(&self, request: ControlRequest) -> Result<(), RuntimeError> {
        self.send(ClientEvent::Control(request))
    }

    /// Empty the log.
    pub fn clear_log(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::ClearLog)
    }

    /// Dismiss the current error.
    pub fn dismiss_error(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::DismissError)
    }

    /// Latest published view.
    pub fn view(&self) -> ClientView {
        self.view.borrow().clone()
    }

    /// Independent receiver for view updates.
    pub fn subscribe(&self) -> watch::Receiver<ClientView> {
        self.view.clone()
    }

    /// Wait until the published view satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&ClientView) -> bool,
    ) -> Result<ClientView, RuntimeError> {
        self.view
            .wait_for(predicate)
            .await
            .map(|view| view.clone())
            .map_err(|_| RuntimeError::Shutdown)
    }

    fn send(&self, event: ClientEvent) -> Result<(), RuntimeError> {
        self.events.send(event).map_err(|_| RuntimeError::Shutdown)
    }
}
