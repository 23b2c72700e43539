//! WebSocket push channel.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use slotwatch_app::{PushEvent, PushStream, PushTransport, TransportError};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::frame::coding::CloseCode},
};
use tracing::{debug, trace};
use url::Url;

/// Close code reported when the socket ends without a close frame, matching
/// what browsers surface for a dropped connection.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Connects to the service's push endpoint.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: Url,
}

impl WsTransport {
    /// Transport for the push endpoint at `url`.
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl PushTransport for WsTransport {
    type Stream = WsStream<MaybeTlsStream<TcpStream>>;

    async fn connect(&self) -> Result<Self::Stream, TransportError> {
        debug!(url = %self.url, "connecting push channel");
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        Ok(WsStream::new(socket))
    }
}

/// An open WebSocket, over any byte stream.
#[derive(Debug)]
pub struct WsStream<S> {
    inner: WebSocketStream<S>,
}

impl<S> WsStream<S> {
    /// Wrap an established WebSocket.
    pub fn new(inner: WebSocketStream<S>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> PushStream for WsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_event(&mut self) -> PushEvent {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return PushEvent::Text(text),
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.into_owned()),
                        None => (u16::from(CloseCode::Status), String::new()),
                    };
                    return PushEvent::Closed { code: Some(code), reason };
                },
                Some(Ok(other)) => {
                    trace!(kind = message_kind(&other), "ignoring non-text message");
                },
                Some(Err(err)) => {
                    return PushEvent::Closed {
                        code: Some(ABNORMAL_CLOSURE),
                        reason: err.to_string(),
                    };
                },
                None => {
                    return PushEvent::Closed {
                        code: Some(ABNORMAL_CLOSURE),
                        reason: "stream ended".to_string(),
                    };
                },
            }
        }
    }

    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    async fn close(&mut self) {
        if let Err(err) = self.inner.close(None).await {
            debug!(error = %err, "close handshake failed");
        }
    }
}

fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}
