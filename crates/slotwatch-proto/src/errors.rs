//! Protocol errors.

use thiserror::Error;

/// Result alias for wire-level parsing.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload is not valid JSON or does not match the expected shape
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Push frame carried an empty event name
    #[error("push frame has an empty event name")]
    EmptyEvent,
}
