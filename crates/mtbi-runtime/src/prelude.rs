//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use mtbi_runtime::prelude::*;
//! ```

pub use crate::definition::{InputSource, PipelineDefinition, RuleDefinition, RuleReference};
pub use crate::engine::{Engine, EngineConfig, ExecutionReport, RuleFailure, RuleState};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::graph::{ExecutionPlan, PlanStep, Rule, RuleGraph, RuleId};
pub use crate::template::{CommandTemplate, Placeholder, Section};
