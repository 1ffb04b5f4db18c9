//! Error types and result alias for the keycast crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Crate-local `Result` alias using the injection error type.
pub type Result<T> = StdResult<T, Error>;

/// Errors that can occur while synthesizing or posting key events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The OS input synthesizer could not be initialized, typically a
    /// missing accessibility permission or display-server connection.
    #[error("Failed to open input synthesizer: {0}")]
    Connect(String),
    /// Emitting a synthetic key failed mid-stream.
    #[error("Failed to emit synthetic key: {0}")]
    Emit(String),
}
