//! Settings resolution.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! command-line flags. Every section of the file is optional and every key
//! inside a section is optional, so a file only needs to name what it
//! changes.
//!
//! ```toml
//! [server]
//! url = "https://monitor.example"
//! request_timeout_secs = 5
//!
//! [sync]
//! poll_interval_secs = 10
//! heartbeat_secs = 30   # 0 disables heartbeats
//!
//! [reconnect]
//! base_delay_ms = 1000
//! max_attempts = 5
//!
//! [monitor]
//! flow = "mozambique-to-portugal"
//! booking_form = { name = "Test User" }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use slotwatch_client::{DEFAULT_TIMEOUT, EndpointError, Endpoints};
use slotwatch_core::{ClientConfig, ClientError};
use thiserror::Error;

use crate::Args;

/// Service used when nothing else is configured.
pub const DEFAULT_SERVER: &str = "http://localhost:8000";

/// Settings could not be resolved.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Resolved values are out of range
    #[error(transparent)]
    Invalid(#[from] ClientError),

    /// Server or push URL is unusable
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// On-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// `[server]`
    pub server: ServerSection,
    /// `[sync]`
    pub sync: SyncSection,
    /// `[reconnect]`
    pub reconnect: ReconnectSection,
    /// `[monitor]`
    pub monitor: MonitorSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Monitor Service base URL
    pub url: Option<String>,
    /// Push channel URL override
    pub ws_url: Option<String>,
    /// Per-request HTTP timeout
    pub request_timeout_secs: Option<u64>,
}

/// `[sync]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    /// Seconds between poll cycles
    pub poll_interval_secs: Option<u64>,
    /// Seconds between heartbeats; 0 disables them
    pub heartbeat_secs: Option<u64>,
    /// Log entries retained
    pub log_capacity: Option<usize>,
}

/// `[reconnect]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectSection {
    /// Delay before the first retry
    pub base_delay_ms: Option<u64>,
    /// Retries before giving up
    pub max_attempts: Option<u32>,
    /// Growth factor between retries
    pub multiplier: Option<u32>,
}

/// `[monitor]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSection {
    /// Flow passed when starting a monitor
    pub flow: Option<String>,
    /// Worker check interval passed when starting a monitor
    pub check_interval_secs: Option<u64>,
    /// `form_data` sent with bookings
    pub booking_form: Option<serde_json::Value>,
}

impl FileConfig {
    /// Parse a TOML document.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&text, path)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Service URLs
    pub endpoints: Endpoints,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Synchronization client tuning
    pub client: ClientConfig,
}

impl Settings {
    /// Resolve settings for `args`, reading the config file it names.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, args)
    }

    /// Layer `file` over the defaults and `args` over both, then validate.
    pub fn resolve(file: FileConfig, args: &Args) -> Result<Self, ConfigError> {
        let FileConfig { server, sync, reconnect, monitor } = file;
        let mut client = ClientConfig::default();

        if let Some(secs) = args.poll_interval_secs.or(sync.poll_interval_secs) {
            client.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = args.heartbeat_secs.or(sync.heartbeat_secs) {
            client.heartbeat_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(capacity) = sync.log_capacity {
            client.log_capacity = capacity;
        }

        if let Some(ms) = reconnect.base_delay_ms {
            client.reconnect.base_delay = Duration::from_millis(ms);
        }
        if let Some(max_attempts) = reconnect.max_attempts {
            client.reconnect.max_attempts = max_attempts;
        }
        if let Some(multiplier) = reconnect.multiplier {
            client.reconnect.multiplier = multiplier;
        }

        if let Some(flow) = monitor.flow {
            client.monitor_flow = flow;
        }
        if let Some(secs) = monitor.check_interval_secs {
            client.check_interval_secs = secs;
        }
        if let Some(form) = monitor.booking_form {
            client.booking_form = form;
        }
        client.validate()?;

        let request_timeout =
            server.request_timeout_secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        if request_timeout.is_zero() {
            return Err(ClientError::InvalidConfig {
                field: "server.request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        let url = args.server.as_deref().or(server.url.as_deref()).unwrap_or(DEFAULT_SERVER);
        let ws_url = args.ws_url.as_deref().or(server.ws_url.as_deref());
        let endpoints = Endpoints::new(url, ws_url)?;

        Ok(Self { endpoints, request_timeout, client })
    }
}
