//! Report types produced by a customization run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::requests::CustMode;

/// Outcome for one machine (sync mode) or the whole batch (async mode)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineOutcome {
    /// Machine name, or the space-joined target list for a batch
    pub target: String,
    /// Whether the target ended up at the requested level (or was already there)
    pub success: bool,
    /// Whether no update was applied (already current, tool no-op, or dry run)
    pub skipped: bool,
    /// Human-readable detail
    pub diagnostic: String,
}

impl MachineOutcome {
    /// Update applied successfully
    pub fn updated(target: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success: true,
            skipped: false,
            diagnostic: diagnostic.into(),
        }
    }

    /// Nothing to do for this target
    pub fn skipped(target: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success: true,
            skipped: true,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Request label
    pub desc: String,
    /// Requested bundle
    pub lpp_source: String,
    /// Level extracted from the bundle name
    pub os_level: String,
    /// Execution mode
    pub mode: CustMode,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Resolved, sorted target list
    pub targets: Vec<String>,
    /// Per-machine (or per-batch) outcomes in processing order
    pub outcomes: Vec<MachineOutcome>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Number of outcomes where an update was applied
    #[must_use]
    pub fn updated_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.skipped).count()
    }

    /// Number of outcomes where nothing was applied
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped).count()
    }
}
