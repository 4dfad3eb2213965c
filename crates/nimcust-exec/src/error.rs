//! Error types for nimcust-exec

use thiserror::Error;

/// Errors that can occur while running a command
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Process spawn error (binary missing, permission denied, ...)
    #[error("failed to spawn `{command}`: {reason}")]
    SpawnError {
        /// Command line that failed to start
        command: String,
        /// Underlying I/O error
        reason: String,
    },

    /// I/O error while reading output or waiting for the process
    #[error("I/O error: {0}")]
    IoError(String),

    /// Invalid command specification
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl ExecError {
    /// Check if the command never started
    #[must_use]
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, ExecError::SpawnError { .. })
    }
}
