//! # Host Error Types

use tether_core::{ExecutorError, RuntimeError};
use thiserror::Error;

/// Errors that can occur while hosting a runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The owner thread could not be started.
    #[error("failed to spawn owner thread: {0}")]
    ThreadSpawn(String),

    /// The owner thread panicked while running a job; the runtime is lost.
    #[error("owner thread {0} panicked")]
    QueuePanicked(String),

    /// Error raised by the runtime.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Error raised by the synchronous handshake.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
