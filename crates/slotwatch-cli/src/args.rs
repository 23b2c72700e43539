//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Watch an appointment monitor from the terminal.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "slotwatch", version, about)]
pub struct Args {
    /// Monitor Service base URL (default http://localhost:8000)
    #[arg(long)]
    pub server: Option<String>,

    /// Push channel URL; derived from --server when omitted
    #[arg(long)]
    pub ws_url: Option<String>,

    /// Seconds between poll cycles
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Seconds between heartbeat pings; 0 disables them
    #[arg(long)]
    pub heartbeat_secs: Option<u64>,

    /// TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}
