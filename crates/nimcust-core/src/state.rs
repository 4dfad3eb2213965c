//! Run state machine types

use serde::{Deserialize, Serialize};

/// States of one customization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Validating,
    ParsingBundle,
    ResolvingTargets,
    Dispatching,
    Completed,
    Failed,
}

impl RunState {
    /// Check whether moving to `next` is allowed
    ///
    /// Each step only advances to the next one; every non-terminal step may fail.
    #[must_use]
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::{
            Completed, Dispatching, Failed, ParsingBundle, ResolvingTargets, Validating,
        };

        if next == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Validating, ParsingBundle)
                | (ParsingBundle, ResolvingTargets)
                | (ResolvingTargets, Dispatching)
                | (Dispatching, Completed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Validating => "validating",
            RunState::ParsingBundle => "parsing_bundle",
            RunState::ResolvingTargets => "resolving_targets",
            RunState::Dispatching => "dispatching",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}
