//! Error types and result alias for the engine crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the suggestion engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Synthetic injection failed mid-operation.
    #[error("Injection error: {0}")]
    Inject(#[from] keycast::Error),

    /// An injection task panicked or was cancelled before completing.
    #[error("Injection task failed: {0}")]
    InjectTask(String),
}
