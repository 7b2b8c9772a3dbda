//! Rule execution states.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Lifecycle state of a rule within one plan run.
///
/// ```text
/// Pending ──> Ready ──> Running ──> Succeeded
///    │                     │
///    └─────────────────────┴──────> Failed
/// ```
///
/// `Pending` moves straight to `Failed` when an input is missing at the
/// moment the rule is due to start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(Display, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RuleState {
    /// Waiting for earlier steps.
    #[default]
    Pending,
    /// Every input exists on disk.
    Ready,
    /// The command is running.
    Running,
    /// The command exited successfully and produced every output.
    Succeeded,
    /// The rule failed.
    Failed,
}

impl RuleState {
    /// Returns whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns whether moving to `next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Ready)
                | (Self::Pending, Self::Failed)
                | (Self::Ready, Self::Running)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }
}
