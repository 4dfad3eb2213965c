//! Diagnostic event types emitted during a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Which output stream of the external command a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// Leveled operator message
    Diagnostic {
        level: EventLevel,
        message: String,
        at: DateTime<Utc>,
    },
    /// Run state machine moved
    StateChanged { from: String, to: String },
    /// Transient progress line; replaces the previous one for the same target
    Progress { target: String, line: String },
    /// Line echoed from the external command
    Output {
        target: String,
        stream: OutputStream,
        line: String,
    },
    /// Update command is about to run for a target
    UpdateStarted { target: String, command: String },
    /// Update command finished for a target
    UpdateFinished { target: String, success: bool },
}

impl RunEvent {
    /// Build a diagnostic stamped with the current time
    pub fn diagnostic(level: EventLevel, message: impl Into<String>) -> Self {
        RunEvent::Diagnostic {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    /// Message text if this is a diagnostic at `level`
    #[must_use]
    pub fn message_at(&self, level: EventLevel) -> Option<&str> {
        match self {
            RunEvent::Diagnostic {
                level: l, message, ..
            } if *l == level => Some(message),
            _ => None,
        }
    }
}
