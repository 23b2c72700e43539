//! Error types for the synchronization core.
//!
//! Runtime input never produces an error here: malformed frames, failed
//! polls and failed controls all become log entries. Errors are reserved for
//! configuration that cannot work.

use thiserror::Error;

/// Errors raised while constructing a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A configuration value is out of range
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}
