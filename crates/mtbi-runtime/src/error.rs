//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::{RuleFailure, RuleState};
use crate::template::Section;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while defining, planning or executing a pipeline.
///
/// Everything except [`PipelineError::RuleExecution`] is raised before any
/// external command runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A rule with the same name is already registered.
    #[error("rule `{0}` is already registered")]
    DuplicateRule(String),

    /// A command template references a slot the rule does not declare.
    #[error("rule `{rule}` references `{{{section}.{slot}}}` but declares no {section} slot `{slot}`")]
    UnresolvedPlaceholder {
        /// Name of the rule owning the template.
        rule: String,
        /// Section the placeholder points into.
        section: Section,
        /// Slot name that could not be resolved.
        slot: String,
    },

    /// A command template could not be parsed.
    #[error("rule `{rule}` has a malformed command template at byte {position}: {message}")]
    MalformedTemplate {
        /// Name of the rule owning the template.
        rule: String,
        /// Byte offset of the offending character.
        position: usize,
        /// Error message.
        message: String,
    },

    /// Two rules declare the same output path.
    #[error("rule `{rule}` declares output {path:?} which is already produced by rule `{producer}`")]
    DuplicateOutput {
        /// Name of the rule being registered.
        rule: String,
        /// Output path declared twice.
        path: PathBuf,
        /// Name of the rule that already produces the path.
        producer: String,
    },

    /// An upstream reference names an unknown rule or output slot.
    #[error("rule `{rule}` input `{slot}` references unknown output `{target_rule}.{output}`")]
    InvalidReference {
        /// Name of the rule holding the reference.
        rule: String,
        /// Input slot holding the reference.
        slot: String,
        /// Referenced rule name.
        target_rule: String,
        /// Referenced output slot.
        output: String,
    },

    /// A required file neither exists nor is produced by any rule.
    #[error("no rule produces {path:?} and the file does not exist{}", .required_by.as_ref().map(|r| format!(" (required by rule `{r}`)")).unwrap_or_default())]
    NoProducer {
        /// The missing path, as declared.
        path: PathBuf,
        /// Rule requiring the path, if any; `None` for the requested target.
        required_by: Option<String>,
    },

    /// Dependency resolution revisited a rule that was still being resolved.
    #[error("cyclic dependency: {}", .chain.join(" -> "))]
    CyclicDependency {
        /// Rule names forming the cycle, first and last being the same rule.
        chain: Vec<String>,
    },

    /// A rule's command failed or did not produce its outputs.
    #[error(transparent)]
    RuleExecution(Box<RuleFailure>),

    /// A rule attempted an illegal state transition.
    #[error("rule `{rule}` cannot move from {from} to {to}")]
    InvalidState {
        /// Name of the rule.
        rule: String,
        /// Current state.
        from: RuleState,
        /// Requested state.
        to: RuleState,
    },

    /// Reading a pipeline definition failed.
    #[error("failed to read {path:?}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A JSON pipeline definition could not be parsed.
    #[error("invalid JSON pipeline definition: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML pipeline definition could not be parsed.
    #[error("invalid TOML pipeline definition: {0}")]
    Toml(#[from] toml::de::Error),

    /// The definition file extension is not recognized.
    #[error("unsupported pipeline definition format: {0:?} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
}

impl From<RuleFailure> for PipelineError {
    fn from(failure: RuleFailure) -> Self {
        Self::RuleExecution(Box::new(failure))
    }
}

impl PipelineError {
    /// Returns the failed rule details for execution errors.
    pub fn as_rule_failure(&self) -> Option<&RuleFailure> {
        match self {
            Self::RuleExecution(failure) => Some(failure),
            _ => None,
        }
    }
}
