//! Runtime errors.

use thiserror::Error;

/// Errors returned by [`crate::RuntimeHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The runtime has exited and no longer accepts commands
    #[error("runtime has shut down")]
    Shutdown,
}
