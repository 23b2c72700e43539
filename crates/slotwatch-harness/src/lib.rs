//! Deterministic simulation harness for slotwatch.
//!
//! Implementations of the Environment, push transport and Monitor Service
//! seams for deterministic, reproducible testing of the full runtime:
//!
//! - [`SimEnv`]: seeded randomness over tokio's (pausable) clock
//! - [`ScriptedApi`]: in-memory Monitor Service with injectable failures and
//!   latency
//! - [`ScriptedTransport`]: in-memory push channel driven by a [`PushServer`]
//! - [`SimTransport`]: real WebSocket handshake over turmoil's simulated TCP
//! - [`model`]: reference model of the client for model-based tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod scripted_api;
pub mod scripted_transport;
pub mod sim_env;
pub mod sim_transport;

pub use scripted_api::{ApiCall, ScriptedApi};
pub use scripted_transport::{PushPeer, PushServer, ScriptedStream, ScriptedTransport};
pub use sim_env::SimEnv;
pub use sim_transport::SimTransport;
