//! Error types for focus-arbiter
//!
//! Builder contract violations fail at the call site; the engine itself
//! never errors. Abandoning unheld focus is a normal `FocusResult::Denied`.

use thiserror::Error;

/// Main error type for focus-arbiter
#[derive(Error, Debug)]
pub enum Error {
    /// Request built with a policy flag that needs a listener, without one
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Listener or execution context missing where one is required
    #[error("Null argument: {0}")]
    NullArgument(String),

    /// Execution context no longer accepts work
    #[error("Execution context terminated: {0}")]
    ContextTerminated(String),

    /// Malformed scenario file
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Name unusable as a worker thread name (empty or containing NUL)
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] focus_common::Error),
}

/// Convenience Result type using focus-arbiter Error
pub type Result<T> = std::result::Result<T, Error>;
