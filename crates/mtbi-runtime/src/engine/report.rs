//! Run reports.

use std::path::PathBuf;

use derive_more::{Debug, Display, From, Into};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::failure::RuleFailure;
use super::state::RuleState;
use crate::error::{PipelineError, PipelineResult};

/// Unique identifier for one execution of a plan.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new time-ordered run ID.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one rule within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReport {
    /// Rule name.
    pub rule: String,
    /// Last state reached.
    pub state: RuleState,
    /// Substituted command line, once rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Exit code of the process, if it ran to completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Time spent running the command.
    pub duration_ms: u64,
}

impl RuleReport {
    pub(crate) fn pending(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            state: RuleState::Pending,
            command: None,
            exit_code: None,
            duration_ms: 0,
        }
    }

    /// Moves the rule to `next`, rejecting illegal transitions.
    pub(crate) fn transition(&mut self, next: RuleState) -> PipelineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidState {
                rule: self.rule.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Result of executing a plan.
///
/// Rules after a failed one are left `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Target the plan was built for.
    pub target: PathBuf,
    /// When execution started.
    pub started_at: Timestamp,
    /// When execution stopped, successfully or not.
    pub finished_at: Option<Timestamp>,
    /// Per-rule outcomes in plan order.
    pub rules: Vec<RuleReport>,
    /// The failure that aborted the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RuleFailure>,
}

impl ExecutionReport {
    pub(crate) fn new(target: PathBuf, rules: Vec<RuleReport>) -> Self {
        Self {
            run_id: RunId::new(),
            target,
            started_at: Timestamp::now(),
            finished_at: None,
            rules,
            failure: None,
        }
    }

    /// Returns whether every rule succeeded.
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
            && self
                .rules
                .iter()
                .all(|rule| rule.state == RuleState::Succeeded)
    }

    /// Returns the final state of a rule.
    pub fn state_of(&self, rule: &str) -> Option<RuleState> {
        self.rules
            .iter()
            .find(|report| report.rule == rule)
            .map(|report| report.state)
    }

    /// Returns the number of rules in a given state.
    pub fn count(&self, state: RuleState) -> usize {
        self.rules.iter().filter(|r| r.state == state).count()
    }

    /// Converts a failed run into [`PipelineError::RuleExecution`].
    pub fn into_result(mut self) -> PipelineResult<Self> {
        match self.failure.take() {
            Some(failure) => Err(failure.into()),
            None => Ok(self),
        }
    }
}
