//! Push transport over turmoil's simulated network.
//!
//! Performs the real WebSocket handshake and framing (tokio-tungstenite)
//! over a simulated TCP stream, so latency, partitions and dropped hosts
//! exercise the same code paths as production.

use async_trait::async_trait;
use slotwatch_app::{PushTransport, TransportError};
use slotwatch_client::{PUSH_PATH, WsStream};
use tokio_tungstenite::client_async;
use tracing::debug;
use turmoil::net::TcpStream;

/// Connects to a simulated host's push endpoint.
#[derive(Debug, Clone)]
pub struct SimTransport {
    addr: String,
    url: String,
}

impl SimTransport {
    /// Transport for the push endpoint served at `addr` (`host:port`).
    pub fn connect_to(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let url = format!("ws://{addr}/{PUSH_PATH}");
        Self { addr, url }
    }
}

#[async_trait]
impl PushTransport for SimTransport {
    type Stream = WsStream<TcpStream>;

    async fn connect(&self) -> Result<Self::Stream, TransportError> {
        debug!(addr = %self.addr, "connecting simulated push channel");
        let tcp = TcpStream::connect(self.addr.as_str())
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        let (socket, _response) = client_async(self.url.as_str(), tcp)
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        Ok(WsStream::new(socket))
    }
}
