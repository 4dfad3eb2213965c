//! Injected diagnostic sink
//!
//! The orchestrator and the NIM driver never print; they hand every operator
//! message and progress line to a `DiagnosticSink`.

use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::events::{EventLevel, OutputStream, RunEvent};

/// Receiver of run events
pub trait DiagnosticSink: Send + Sync {
    /// Deliver one event
    fn emit(&self, event: RunEvent);

    fn debug(&self, message: &str) {
        self.emit(RunEvent::diagnostic(EventLevel::Debug, message));
    }

    fn info(&self, message: &str) {
        self.emit(RunEvent::diagnostic(EventLevel::Info, message));
    }

    fn warn(&self, message: &str) {
        self.emit(RunEvent::diagnostic(EventLevel::Warn, message));
    }

    fn error(&self, message: &str) {
        self.emit(RunEvent::diagnostic(EventLevel::Error, message));
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _event: RunEvent) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::Diagnostic { level, message, .. } => match level {
                EventLevel::Debug => debug!("{message}"),
                EventLevel::Info => info!("{message}"),
                EventLevel::Warn => warn!("{message}"),
                EventLevel::Error => error!("{message}"),
            },
            RunEvent::StateChanged { from, to } => debug!(%from, %to, "run state transition"),
            RunEvent::Progress { target, line } => debug!(host = %target, "{line}"),
            RunEvent::Output {
                target,
                stream: OutputStream::Stderr,
                line,
            } => warn!(host = %target, "{line}"),
            RunEvent::Output { target, line, .. } => debug!(host = %target, "{line}"),
            RunEvent::UpdateStarted { target, command } => {
                info!(host = %target, %command, "nim custom operation");
            }
            RunEvent::UpdateFinished { target, success } => {
                info!(host = %target, success, "nim custom operation finished");
            }
        }
    }
}

/// Records every event, for tests and for replaying a run
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RunEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Messages of all diagnostics recorded at `level`
    #[must_use]
    pub fn messages(&self, level: EventLevel) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.message_at(level).map(str::to_string))
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, event: RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl DiagnosticSink for broadcast::Sender<RunEvent> {
    fn emit(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.send(event);
    }
}
