//! Monitor Service endpoints.

use thiserror::Error;
use url::Url;

/// Path of the push channel on the service.
pub const PUSH_PATH: &str = "ws/monitor-updates";

/// Endpoint configuration errors.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// URL did not parse
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        /// Offending input
        url: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// Scheme is not usable for this endpoint
    #[error("unsupported scheme {scheme} in {url}")]
    UnsupportedScheme {
        /// Offending input
        url: String,
        /// Scheme found
        scheme: String,
    },
}

/// Resolved service URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base: Url,
    push: Url,
}

impl Endpoints {
    /// Endpoints for the service at `server`, with the push URL derived from
    /// it (`http` becomes `ws`, `https` becomes `wss`).
    pub fn from_server(server: &str) -> Result<Self, EndpointError> {
        Self::new(server, None)
    }

    /// Endpoints for the service at `server`, optionally overriding the push
    /// URL.
    pub fn new(server: &str, push_override: Option<&str>) -> Result<Self, EndpointError> {
        let mut api_base = parse(server)?;
        if !matches!(api_base.scheme(), "http" | "https") {
            return Err(unsupported(server, api_base.scheme()));
        }
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let push = match push_override {
            Some(push) => {
                let url = parse(push)?;
                if !matches!(url.scheme(), "ws" | "wss") {
                    return Err(unsupported(push, url.scheme()));
                }
                url
            },
            None => {
                let scheme = if api_base.scheme() == "https" { "wss" } else { "ws" };
                let joined = join(&api_base, PUSH_PATH)?;
                let derived = format!("{scheme}{}", &joined.as_str()[joined.scheme().len()..]);
                parse(&derived)?
            },
        };

        Ok(Self { api_base, push })
    }

    /// Base URL of the HTTP API, always ending in `/`.
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Push channel URL.
    pub fn push(&self) -> &Url {
        &self.push
    }

    /// `GET`/`POST /monitors/`
    pub fn monitors(&self) -> Result<Url, EndpointError> {
        join(&self.api_base, "monitors/")
    }

    /// `GET /monitors/status`
    pub fn monitor_status(&self) -> Result<Url, EndpointError> {
        join(&self.api_base, "monitors/status")
    }

    /// `POST /monitors/{id}/stop`
    pub fn stop_monitor(&self, monitor_id: i64) -> Result<Url, EndpointError> {
        join(&self.api_base, &format!("monitors/{monitor_id}/stop"))
    }

    /// `POST /bookings/`
    pub fn bookings(&self) -> Result<Url, EndpointError> {
        join(&self.api_base, "bookings/")
    }
}

fn parse(url: &str) -> Result<Url, EndpointError> {
    Url::parse(url).map_err(|source| EndpointError::InvalidUrl { url: url.to_string(), source })
}

fn join(base: &Url, path: &str) -> Result<Url, EndpointError> {
    base.join(path)
        .map_err(|source| EndpointError::InvalidUrl { url: format!("{base}{path}"), source })
}

fn unsupported(url: &str, scheme: &str) -> EndpointError {
    EndpointError::UnsupportedScheme { url: url.to_string(), scheme: scheme.to_string() }
}
