//! Console front-end for slotwatch
//!
//! A thin shell over [`slotwatch_app::Runtime`]: it resolves settings from
//! defaults, an optional TOML file and the command line, wires the HTTP and
//! WebSocket adapters, prints the published view as plain lines and turns
//! slash commands into runtime requests. All synchronization logic lives in
//! the core.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod commands;
pub mod config;
pub mod console;
pub mod logging;

pub use args::Args;
pub use commands::Command;
pub use config::{ConfigError, FileConfig, Settings};
pub use console::ConsoleView;
