//! Error types and result alias for the hookev crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Crate-local `Result` alias using the hook error type.
pub type Result<T> = StdResult<T, Error>;

/// Errors that can occur while installing or running the global hook.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The OS refused the hook, typically a missing input-monitoring
    /// permission or an unsupported display server.
    #[error("Failed to install global keyboard hook: {0}")]
    Listen(String),
}

impl Error {
    /// Wrap the hook library's non-`std::error` listen failure.
    pub(crate) fn from_listen(e: rdev::ListenError) -> Self {
        Self::Listen(format!("{e:?}"))
    }
}
