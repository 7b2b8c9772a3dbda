#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;
mod telemetry;

use std::process;

use anyhow::Context;
use mtbi_runtime::PipelineError;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "mtbi_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "mtbi_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "mtbi_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "mtbi_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::debug!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    }

    // Rule failures carry the command line and stderr; print them in full.
    let failure = error
        .downcast_ref::<PipelineError>()
        .and_then(PipelineError::as_rule_failure);
    match failure {
        Some(failure) => eprintln!("Error: {}", failure.diagnostic()),
        None => eprintln!("Error: {error:#}"),
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing(cli.logging.log_format)?;
    cli.log();
    cli.validate().context("invalid configuration")?;

    command::dispatch(&cli).await
}
