//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── command: Command          # list | plan | run
//! ├── pipeline: PipelineConfig  # Pipeline file and working directory
//! ├── engine: EngineArgs        # Shell, timeout, diagnostics
//! └── logging: LoggingConfig    # Log output format
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! # Run the default target with a per-rule timeout
//! mtbi run -f pipeline.toml --rule-timeout 3600
//!
//! # Or via environment variables
//! MTBI_PIPELINE=pipeline.toml MTBI_RULE_TIMEOUT=3600 mtbi run
//! ```

mod engine;
mod logging;
mod pipeline;

use std::process;

use anyhow::Context;
use clap::Parser;
pub use engine::EngineArgs;
pub use logging::{LogFormat, LoggingConfig};
pub use pipeline::PipelineConfig;

use crate::TRACING_TARGET_STARTUP;
use crate::command::Command;

/// Complete CLI configuration.
///
/// Combines all configuration groups for the pipeline runner:
/// - [`Command`]: What to do with the pipeline
/// - [`PipelineConfig`]: Where the rule definitions live
/// - [`EngineArgs`]: How rule commands are executed
/// - [`LoggingConfig`]: How logs are rendered
#[derive(Debug, Clone, Parser)]
#[command(name = "mtbi")]
#[command(about = "Rule pipeline runner for mTBI EEG analysis")]
#[command(version)]
pub struct Cli {
    /// Operation to perform.
    #[command(subcommand)]
    pub command: Command,

    /// Pipeline file and working directory.
    #[clap(flatten)]
    pub pipeline: PipelineConfig,

    /// Rule execution configuration.
    #[clap(flatten)]
    pub engine: EngineArgs,

    /// Logging configuration.
    #[clap(flatten)]
    pub logging: LoggingConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// This ensures .env files are loaded before clap parses arguments, allowing
    /// environment variables from .env to be used as defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.engine
            .to_engine_config()
            .context("invalid engine configuration")?;
        Ok(())
    }

    /// Logs build information and configuration at debug level.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.pipeline.log();
        self.engine.log();
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mtbi",
            "plan",
            "y.pickle",
            "-f",
            "eeg.toml",
            "--shell",
            "bash",
            "--rule-timeout",
            "60",
        ])
        .unwrap();

        assert_eq!(cli.pipeline.file, PathBuf::from("eeg.toml"));
        assert_eq!(cli.engine.shell, "bash");
        assert_eq!(cli.engine.rule_timeout, Some(60));
        assert!(matches!(
            cli.command,
            Command::Plan(ref args) if args.target == Some(PathBuf::from("y.pickle"))
        ));
    }

    #[test]
    fn test_defaults_are_valid() {
        let cli = Cli::try_parse_from(["mtbi", "list"]).unwrap();
        assert_eq!(cli.pipeline.file, PathBuf::from("pipeline.toml"));
        assert_eq!(cli.logging.log_format, LogFormat::Pretty);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let cli = Cli::try_parse_from(["mtbi", "run", "--rule-timeout", "0"]).unwrap();
        assert!(cli.validate().is_err());
    }
}
