//! Request types for a customization run

use serde::{Deserialize, Serialize};

/// Execution mode of a customization run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustMode {
    /// One `nim -o cust` per machine, in sorted order, gated on current level
    #[default]
    Sync,
    /// A single `nim -o cust -a async=yes` over every target, no level gating
    Async,
}

impl CustMode {
    /// Mode selected by the `async` property
    #[must_use]
    pub fn from_async_flag(is_async: bool) -> Self {
        if is_async { Self::Async } else { Self::Sync }
    }
}

impl std::fmt::Display for CustMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustMode::Sync => write!(f, "sync"),
            CustMode::Async => write!(f, "async"),
        }
    }
}

/// One customization run: bundle, target specification and mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustRequest {
    /// Identifying label, not used in logic
    #[serde(default)]
    pub desc: String,
    /// lpp_source bundle to install
    pub lpp_source: String,
    /// Comma-separated wildcard machine spec (unset means all known machines)
    #[serde(default)]
    pub targets: Option<String>,
    /// Execution mode
    #[serde(default)]
    pub mode: CustMode,
    /// Run every decision but never execute the update command
    #[serde(default)]
    pub dry_run: bool,
}

impl CustRequest {
    /// Create a sync-mode request over all known machines
    pub fn new(lpp_source: impl Into<String>) -> Self {
        Self {
            desc: String::new(),
            lpp_source: lpp_source.into(),
            targets: None,
            mode: CustMode::Sync,
            dry_run: false,
        }
    }

    /// Set the description label
    #[must_use]
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    /// Set the target specification
    #[must_use]
    pub fn with_targets(mut self, targets: impl Into<String>) -> Self {
        self.targets = Some(targets.into());
        self
    }

    /// Set the execution mode
    #[must_use]
    pub fn with_mode(mut self, mode: CustMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable dry-run
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
