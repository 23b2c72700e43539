//! Application layer for slotwatch
//!
//! The generic runtime that executes the synchronization core's actions on
//! tokio, plus the seams it performs I/O through. The same runtime runs in
//! production and under the simulation harness; only the seam
//! implementations differ.
//!
//! # Components
//!
//! - [`PushTransport`] / [`PushStream`]: push channel seam
//! - [`MonitorApi`]: Monitor Service API seam
//! - [`SystemEnv`]: production time and randomness
//! - [`Runtime`]: single-task orchestration loop
//! - [`RuntimeHandle`]: commands in, views out

mod api;
mod env;
mod error;
mod runtime;
mod transport;

pub use api::{ApiError, MonitorApi};
pub use env::SystemEnv;
pub use error::RuntimeError;
pub use runtime::{Runtime, RuntimeHandle, TICK_INTERVAL};
pub use transport::{PushEvent, PushStream, PushTransport, TransportError};
