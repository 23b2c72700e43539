//! Push channel seam.
//!
//! Production connects over WebSocket, tests use an in-memory script or a
//! turmoil-simulated socket. The runtime only ever sees text payloads and a
//! close notification; every transport error kind is reported the same way.

use async_trait::async_trait;
use thiserror::Error;

/// Push channel failures. Not sub-classified further: every variant leads to
/// the same reconnect handling.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Handshake could not be completed
    #[error("connect failed: {0}")]
    Connect(String),

    /// Outbound write failed
    #[error("send failed: {0}")]
    Send(String),

    /// Channel already closed
    #[error("connection closed")]
    Closed,
}

/// Something read from an open push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A text payload
    Text(String),
    /// The channel ended
    Closed {
        /// Close code, when the peer sent one
        code: Option<u16>,
        /// Close reason or error text
        reason: String,
    },
}

/// Opens push channels.
#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
    /// An open channel.
    type Stream: PushStream;

    /// Connect and complete the handshake.
    async fn connect(&self) -> Result<Self::Stream, TransportError>;
}

/// One open push channel.
#[async_trait]
pub trait PushStream: Send + 'static {
    /// Next payload or the close.
    ///
    /// Must be cancel safe: the runtime races it against outbound traffic.
    /// After returning `Closed` the stream is not polled again.
    async fn next_event(&mut self) -> PushEvent;

    /// Send a text payload.
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Close the channel. Errors are ignored; the channel is abandoned either
    /// way.
    async fn close(&mut self);
}
