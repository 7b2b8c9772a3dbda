//! Rule execution engine.
//!
//! This module provides the runtime for executing plans:
//! - [`Engine`]: runs plan steps sequentially through the configured shell
//! - [`EngineConfig`]: configuration options
//! - [`ExecutionReport`]: per-rule outcome of a run

mod command;
mod config;
mod executor;
mod failure;
mod report;
mod state;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use executor::Engine;
pub use failure::{FailureReason, RuleFailure};
pub use report::{ExecutionReport, RuleReport, RunId};
pub use state::RuleState;

/// Tracing target for engine operations.
const TRACING_TARGET: &str = "mtbi_runtime::engine";
