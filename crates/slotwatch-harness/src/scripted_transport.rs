//! In-memory push channel.
//!
//! [`ScriptedTransport`] is handed to the runtime; the test keeps the
//! matching [`PushServer`]. Every connection the runtime opens is either
//! refused (when a refusal was queued) or accepted, in which case the test
//! receives a [`PushPeer`] to drive it from the server side.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use slotwatch_app::{PushEvent, PushStream, PushTransport, TransportError};
use slotwatch_client::ABNORMAL_CLOSURE;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Default)]
struct Plan {
    refusals: VecDeque<String>,
    refuse_all: Option<String>,
    attempts: usize,
}

/// Client side of the in-memory push channel.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    plan: Arc<Mutex<Plan>>,
    accepted: mpsc::UnboundedSender<PushPeer>,
}

/// Server side of the in-memory push channel.
#[derive(Debug)]
pub struct PushServer {
    plan: Arc<Mutex<Plan>>,
    accepted: mpsc::UnboundedReceiver<PushPeer>,
}

impl ScriptedTransport {
    /// A transport and the server controlling it.
    pub fn new() -> (Self, PushServer) {
        let plan = Arc::new(Mutex::new(Plan::default()));
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        (
            Self { plan: Arc::clone(&plan), accepted: accepted_tx },
            PushServer { plan, accepted: accepted_rx },
        )
    }
}

fn lock(plan: &Mutex<Plan>) -> MutexGuard<'_, Plan> {
    plan.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    type Stream = ScriptedStream;

    async fn connect(&self) -> Result<Self::Stream, TransportError> {
        let refusal = {
            let mut plan = lock(&self.plan);
            plan.attempts += 1;
            plan.refusals.pop_front().or_else(|| plan.refuse_all.clone())
        };
        if let Some(reason) = refusal {
            debug!(%reason, "refusing push connection");
            return Err(TransportError::Connect(reason));
        }

        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        self.accepted
            .send(PushPeer { to_client, from_client })
            .map_err(|_| TransportError::Connect("server gone".to_string()))?;
        Ok(ScriptedStream { incoming, outgoing: Some(outgoing) })
    }
}

impl PushServer {
    /// Refuse the next connection attempt with `reason`.
    pub fn refuse_next(&self, reason: &str) {
        lock(&self.plan).refusals.push_back(reason.to_string());
    }

    /// Refuse every attempt until [`PushServer::accept_all`].
    pub fn refuse_all(&self, reason: &str) {
        lock(&self.plan).refuse_all = Some(reason.to_string());
    }

    /// Stop refusing.
    pub fn accept_all(&self) {
        let mut plan = lock(&self.plan);
        plan.refusals.clear();
        plan.refuse_all = None;
    }

    /// Connection attempts seen so far, refused or not.
    pub fn attempts(&self) -> usize {
        lock(&self.plan).attempts
    }

    /// Wait for the next accepted connection.
    pub async fn accept(&mut self) -> Option<PushPeer> {
        self.accepted.recv().await
    }
}

/// Server end of one accepted connection.
///
/// Dropping it without [`PushPeer::close`] looks like an abnormal closure
/// (1006) to the client.
#[derive(Debug)]
pub struct PushPeer {
    to_client: mpsc::UnboundedSender<PushEvent>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl PushPeer {
    /// Push a text payload. Returns `false` once the client has gone.
    pub fn send_text(&self, text: &str) -> bool {
        self.to_client.send(PushEvent::Text(text.to_string())).is_ok()
    }

    /// Close with a close frame.
    pub fn close(self, code: u16, reason: &str) {
        let frame = PushEvent::Closed { code: Some(code), reason: reason.to_string() };
        let _ = self.to_client.send(frame);
    }

    /// Next text the client sent, or `None` once the client closed or
    /// dropped its stream and everything sent before that was read.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Whether the client has closed its end.
    pub fn is_closed(&self) -> bool {
        self.to_client.is_closed()
    }
}

/// Client end of one accepted connection.
#[derive(Debug)]
pub struct ScriptedStream {
    incoming: mpsc::UnboundedReceiver<PushEvent>,
    /// `None` once closed
    outgoing: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl PushStream for ScriptedStream {
    async fn next_event(&mut self) -> PushEvent {
        match self.incoming.recv().await {
            Some(event) => event,
            None => PushEvent::Closed {
                code: Some(ABNORMAL_CLOSURE),
                reason: "peer dropped".to_string(),
            },
        }
    }

    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        let outgoing = self.outgoing.as_ref().ok_or(TransportError::Closed)?;
        outgoing.send(text.to_string()).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        self.incoming.close();
        self.outgoing = None;
    }
}
