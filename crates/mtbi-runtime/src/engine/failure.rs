//! Rule failure details.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

/// Why a rule failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureReason {
    /// Inputs were missing when the rule was due to start.
    MissingInputs {
        /// Missing paths, as declared.
        paths: Vec<PathBuf>,
    },
    /// The command line could not be rendered.
    InvalidCommand {
        /// Error message.
        message: String,
    },
    /// Preparing directories or writing the log file failed.
    Filesystem {
        /// Error message.
        message: String,
    },
    /// The process could not be started.
    Spawn {
        /// Error message.
        message: String,
    },
    /// The process exited with a non-zero status.
    ExitStatus {
        /// Exit code reported by the process.
        code: i32,
    },
    /// The process was terminated without an exit code.
    Terminated,
    /// The process exceeded the configured timeout and was killed.
    TimedOut {
        /// Timeout that was exceeded, in milliseconds.
        timeout_ms: u64,
    },
    /// The process succeeded but some declared outputs do not exist.
    MissingOutputs {
        /// Missing paths, as declared.
        paths: Vec<PathBuf>,
    },
}

impl FailureReason {
    pub(crate) fn timed_out(timeout: Duration) -> Self {
        Self::TimedOut {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns a short machine-friendly name for the reason.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInputs { paths } => write!(f, "missing inputs {}", join_paths(paths)),
            Self::InvalidCommand { message } => write!(f, "invalid command: {message}"),
            Self::Filesystem { message } => write!(f, "filesystem error: {message}"),
            Self::Spawn { message } => write!(f, "failed to start command: {message}"),
            Self::ExitStatus { code } => write!(f, "exited with status {code}"),
            Self::Terminated => f.write_str("terminated by signal"),
            Self::TimedOut { timeout_ms } => write!(f, "timed out after {timeout_ms}ms"),
            Self::MissingOutputs { paths } => {
                write!(f, "missing declared outputs {}", join_paths(paths))
            }
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("{:?}", p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A failed rule, with everything needed to diagnose it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("rule `{rule}` failed: {reason}")]
pub struct RuleFailure {
    /// Name of the failed rule.
    pub rule: String,
    /// Substituted command line, if it could be rendered.
    pub command: Option<String>,
    /// Why the rule failed.
    pub reason: FailureReason,
    /// Exit code of the process, if it exited.
    pub exit_code: Option<i32>,
    /// Trailing part of the process's stderr.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl RuleFailure {
    pub(crate) fn new(rule: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            rule: rule.into(),
            command: None,
            reason,
            exit_code: None,
            stderr: String::new(),
        }
    }

    pub(crate) fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub(crate) fn with_output(mut self, exit_code: Option<i32>, stderr: String) -> Self {
        self.exit_code = exit_code;
        self.stderr = stderr;
        self
    }

    /// Formats the failure with its command line and stderr on separate lines.
    pub fn diagnostic(&self) -> String {
        let mut text = self.to_string();
        if let Some(command) = &self.command {
            text.push_str("\n  command: ");
            text.push_str(command);
        }
        if let Some(code) = self.exit_code {
            text.push_str(&format!("\n  exit code: {code}"));
        }
        if !self.stderr.is_empty() {
            text.push_str("\n  stderr:");
            for line in self.stderr.lines() {
                text.push_str("\n    ");
                text.push_str(line);
            }
        }
        text
    }
}
