//! Per-configuration pipeline state.
//!
//! ```text
//! Generated -> Validated -> Building -> BuildSucceeded -> BootTesting
//!     |                         |                             |
//!  Invalid                 BuildFailed            BootFailed / BootSucceeded
//!                                                                 |
//!                                                 FunctionalTesting -> Completed
//! ```
//!
//! Any non-terminal state may move to `Aborted` (worker panic or run
//! cancellation).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Generated,
    Validated,
    Invalid,
    Building,
    BuildFailed,
    BuildSucceeded,
    BootTesting,
    BootFailed,
    BootSucceeded,
    FunctionalTesting,
    Completed,
    Aborted,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Generated => "generated",
            PipelineState::Validated => "validated",
            PipelineState::Invalid => "invalid",
            PipelineState::Building => "building",
            PipelineState::BuildFailed => "build_failed",
            PipelineState::BuildSucceeded => "build_succeeded",
            PipelineState::BootTesting => "boot_testing",
            PipelineState::BootFailed => "boot_failed",
            PipelineState::BootSucceeded => "boot_succeeded",
            PipelineState::FunctionalTesting => "functional_testing",
            PipelineState::Completed => "completed",
            PipelineState::Aborted => "aborted",
        }
    }

    /// All valid transitions FROM this state.
    pub fn valid_next_states(&self) -> Vec<PipelineState> {
        use PipelineState::*;
        match self {
            Generated => vec![Validated, Invalid, Aborted],
            Validated => vec![Building, Aborted],
            Building => vec![BuildSucceeded, BuildFailed, Aborted],
            BuildSucceeded => vec![BootTesting, Aborted],
            BootTesting => vec![BootSucceeded, BootFailed, Aborted],
            BootSucceeded => vec![FunctionalTesting, Aborted],
            FunctionalTesting => vec![Completed, Aborted],
            Invalid | BuildFailed | BootFailed | Completed | Aborted => vec![],
        }
    }

    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        self.valid_next_states().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_next_states().is_empty()
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus every state visited, starting at `Generated`.
#[derive(Debug, Clone)]
pub struct PipelineTracker {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Default for PipelineTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineTracker {
    pub fn new() -> Self {
        PipelineTracker {
            state: PipelineState::Generated,
            history: vec![PipelineState::Generated],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Attempt to move to `next`.
    pub fn advance(&mut self, next: PipelineState) -> Result<(), String> {
        if !self.state.can_transition_to(next) {
            return Err(format!(
                "Invalid pipeline transition: {} -> {}",
                self.state.as_str(),
                next.as_str()
            ));
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Aborted` unless already terminal.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = PipelineState::Aborted;
            self.history.push(PipelineState::Aborted);
        }
    }

    pub fn into_parts(self) -> (PipelineState, Vec<PipelineState>) {
        (self.state, self.history)
    }
}
