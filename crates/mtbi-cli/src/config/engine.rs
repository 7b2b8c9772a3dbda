//! Rule execution configuration.

use std::time::Duration;

use clap::Args;
use mtbi_runtime::engine::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Rule execution configuration.
///
/// # Environment Variables
///
/// - `MTBI_SHELL` - Program used to run rule commands (default: sh)
/// - `MTBI_RULE_TIMEOUT` - Per-rule timeout in seconds (default: none)
/// - `MTBI_STDERR_TAIL_BYTES` - Stderr bytes kept for failure reports (default: 4096)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct EngineArgs {
    /// Program rule commands are handed to, invoked as `<shell> -c <command>`.
    #[arg(long, env = "MTBI_SHELL", default_value = "sh", global = true)]
    pub shell: String,

    /// Maximum time in seconds a single rule may run before it is killed.
    ///
    /// Rules run without a limit when unset.
    #[arg(long, env = "MTBI_RULE_TIMEOUT", global = true)]
    pub rule_timeout: Option<u64>,

    /// Number of trailing stderr bytes kept when a rule fails.
    #[arg(
        long,
        env = "MTBI_STDERR_TAIL_BYTES",
        default_value_t = 4096,
        global = true
    )]
    pub stderr_tail_bytes: usize,
}

impl EngineArgs {
    /// Builds the runtime engine configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell is empty or the timeout is zero.
    pub fn to_engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut builder = EngineConfig::builder();
        builder
            .shell(self.shell.clone())
            .stderr_tail_bytes(self.stderr_tail_bytes);
        if let Some(secs) = self.rule_timeout {
            builder.rule_timeout(Duration::from_secs(secs));
        }
        Ok(builder.build()?)
    }

    /// Logs the execution settings at debug level.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            shell = %self.shell,
            rule_timeout = ?self.rule_timeout,
            stderr_tail_bytes = self.stderr_tail_bytes,
            "Engine configuration"
        );
    }
}
