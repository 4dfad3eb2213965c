//! Error types for nimcust-inventory

use thiserror::Error;

/// Errors that can occur while reading the inventory snapshot
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    /// Snapshot file could not be read
    #[error("cannot read inventory {path}: {reason}")]
    ReadFailed {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        reason: String,
    },

    /// Snapshot is not valid JSON or has the wrong shape
    #[error("JSON parse error: {0}")]
    ParseError(String),

    /// Snapshot has no NIM client section at all
    #[error("no nim client information in inventory")]
    MissingClients,

    /// Inventory command could not be executed
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// Inventory command exited with a failure status
    #[error("inventory command failed: {status} - {stderr}")]
    CommandFailed {
        /// Exit status
        status: i32,
        /// Stderr output
        stderr: String,
    },
}

impl InventoryError {
    /// Check if the snapshot was read but lacks the client section
    #[must_use]
    pub fn is_missing_section(&self) -> bool {
        matches!(self, InventoryError::MissingClients)
    }
}
