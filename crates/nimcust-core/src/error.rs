//! Core error types for nimcust-core

use nimcust_nim::NimError;
use thiserror::Error;

use crate::state::RunState;

/// Errors that abort a customization run
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Machine inventory cannot be read at all
    #[error("cannot find nim info from inventory: {0}")]
    InventoryUnavailable(String),

    /// Requested bundle is unknown or malformed
    #[error("invalid lpp_source '{lpp_source}': {reason}")]
    InvalidBundle {
        /// Requested bundle name
        lpp_source: String,
        /// Why it was rejected
        reason: String,
    },

    /// Target specification matched no known machine
    #[error("targets '{spec}' match no nim client")]
    NoTargetsResolved {
        /// Target specification as given (empty for "all")
        spec: String,
    },

    /// A target pattern could not be compiled
    #[error("invalid target pattern '{pattern}': {reason}")]
    InvalidTargetPattern {
        /// Offending pattern
        pattern: String,
        /// Regex compilation error
        reason: String,
    },

    /// nim cust failed on a machine or batch
    #[error("cannot update {target} (status {status}): {diagnostic}")]
    UpdateCommandFailed {
        /// Machine name, or space-joined batch
        target: String,
        /// Exit status, -1 if the command could not run
        status: i32,
        /// Tool output, verbatim
        diagnostic: String,
    },

    /// Invalid state transition attempted
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: RunState,
        /// Attempted target state
        to: RunState,
    },
}

impl CoreError {
    /// Name of the run step that failed
    #[must_use]
    pub fn step(&self) -> &'static str {
        match self {
            CoreError::InventoryUnavailable(_) => "inventory",
            CoreError::InvalidBundle { .. } => "lpp_source validation",
            CoreError::NoTargetsResolved { .. } | CoreError::InvalidTargetPattern { .. } => {
                "target resolution"
            }
            CoreError::UpdateCommandFailed { .. } => "nim custom operation",
            CoreError::InvalidTransition { .. } => "state machine",
        }
    }
}

impl From<NimError> for CoreError {
    fn from(e: NimError) -> Self {
        match e {
            NimError::CustFailed {
                target,
                status,
                diagnostic,
            } => CoreError::UpdateCommandFailed {
                target,
                status,
                diagnostic,
            },
            NimError::Execution { target, reason } => CoreError::UpdateCommandFailed {
                target,
                status: -1,
                diagnostic: reason,
            },
        }
    }
}
