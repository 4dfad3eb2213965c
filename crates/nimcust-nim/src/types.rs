//! Type definitions for NIM customization

use serde::{Deserialize, Serialize};

/// Verdict on one `nim -o cust` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustClassification {
    /// Command reported success
    Success,
    /// Tool said the software is already at the media level
    BenignNoop,
    /// Genuine failure
    Failure,
}

impl CustClassification {
    /// Whether the run should continue
    #[must_use]
    pub fn is_ok(self) -> bool {
        !matches!(self, CustClassification::Failure)
    }
}

impl std::fmt::Display for CustClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustClassification::Success => write!(f, "success"),
            CustClassification::BenignNoop => write!(f, "already at media level"),
            CustClassification::Failure => write!(f, "failure"),
        }
    }
}
