//! # Core Error Types

use thiserror::Error;

/// Errors raised by a runtime while running user code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Script evaluation failed.
    #[error("evaluation failed in {source_url}: {message}")]
    Evaluation {
        /// Where the failing source came from.
        source_url: String,
        /// Engine-provided message.
        message: String,
    },

    /// A global or property lookup found nothing.
    #[error("property not found: {0}")]
    PropertyNotFound(String),

    /// Failure reported by host code running against the runtime.
    #[error("host error: {0}")]
    Host(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised by the synchronous execution handshake.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor dropped the callback without ever running it.
    #[error("runtime executor dropped the callback without running it")]
    CallbackDropped,
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
