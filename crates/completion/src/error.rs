//! Error types and result alias for the completion crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Crate-local `Result` alias using the provider error type.
pub type Result<T> = StdResult<T, Error>;

/// Errors that can occur while requesting a completion.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (DNS, TLS, timeout, malformed response body).
    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("Completion service returned HTTP {0}")]
    Status(u16),
    /// The service answered successfully but produced no candidate text.
    #[error("Completion service returned no candidates")]
    Empty,
}
