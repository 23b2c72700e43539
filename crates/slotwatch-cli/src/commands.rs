//! Command parsing for the console.
//!
//! This module parses input lines into structured [`Command`] values.

use slotwatch_core::ControlRequest;

/// Shown for `/help`.
pub const HELP: &str = "\
commands:
  /start      start monitoring
  /stop       stop the active monitor
  /book       trigger a booking for the active run
  /reconnect  reconnect the push channel
  /clear      clear the event log
  /dismiss    dismiss the current error
  /status     print the current state
  /quit       exit";

/// Parsed command from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,

    /// Monitor control (`/start`, `/stop`, `/book`).
    Control(ControlRequest),

    /// Reconnect the push channel.
    Reconnect,

    /// Clear the event log.
    Clear,

    /// Dismiss the current error.
    Dismiss,

    /// Print the current state.
    Status,

    /// Print the command list.
    Help,

    /// Quit the application.
    Quit,

    /// Unknown or invalid command.
    Unknown {
        /// The original input.
        input: String,
    },

    /// Command with unexpected arguments.
    InvalidArgs {
        /// Command name.
        command: String,
        /// Error message.
        error: String,
    },
}

/// Parse a user input string into a command.
///
/// Commands start with `/`. None of them take arguments.
pub fn parse(input: &str) -> Command {
    let input = input.trim();

    if input.is_empty() {
        return Command::Empty;
    }

    let Some(cmd_str) = input.strip_prefix('/') else {
        return Command::Unknown { input: input.to_string() };
    };

    let mut parts = cmd_str.split_whitespace();
    let name = parts.next().unwrap_or("");

    let command = match name {
        "start" => Command::Control(ControlRequest::StartMonitor),
        "stop" => Command::Control(ControlRequest::StopMonitor),
        "book" => Command::Control(ControlRequest::TriggerBooking),
        "reconnect" => Command::Reconnect,
        "clear" => Command::Clear,
        "dismiss" => Command::Dismiss,
        "status" => Command::Status,
        "help" | "h" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => return Command::Unknown { input: input.to_string() },
    };

    if parts.next().is_some() {
        return Command::InvalidArgs {
            command: name.to_string(),
            error: format!("Usage: /{name}"),
        };
    }
    command
}
