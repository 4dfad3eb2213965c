//! Error types for nimcust-nim

use thiserror::Error;

/// Errors that can occur during a NIM customization
#[derive(Error, Debug, Clone)]
pub enum NimError {
    /// `nim -o cust` reported failure and no benign no-op was recognized
    #[error("nim cust failed on {target} (status {status}): {diagnostic}")]
    CustFailed {
        /// Machine, or space-joined target list for a batch
        target: String,
        /// Exit status of the nim command
        status: i32,
        /// Tool output, verbatim
        diagnostic: String,
    },

    /// The nim command could not be run at all
    #[error("execution error on {target}: {reason}")]
    Execution {
        /// Machine, or space-joined target list for a batch
        target: String,
        /// Underlying executor error
        reason: String,
    },
}

impl NimError {
    /// Target the failed invocation covered
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            NimError::CustFailed { target, .. } | NimError::Execution { target, .. } => target,
        }
    }
}
