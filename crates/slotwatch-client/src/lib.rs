//! Production adapters for slotwatch.
//!
//! [`Endpoints`] resolves the Monitor Service URLs and is always available.
//! With the `transport` feature the crate also provides the WebSocket push
//! transport ([`WsTransport`]) and the HTTP API client ([`HttpMonitorApi`])
//! that plug into [`slotwatch_app::Runtime`].

#![forbid(unsafe_code)]

mod endpoints;
#[cfg(feature = "transport")]
mod http;
#[cfg(feature = "transport")]
mod ws;

pub use endpoints::{EndpointError, Endpoints, PUSH_PATH};
#[cfg(feature = "transport")]
pub use http::{DEFAULT_TIMEOUT, HttpMonitorApi};
#[cfg(feature = "transport")]
pub use ws::{ABNORMAL_CLOSURE, WsStream, WsTransport};
