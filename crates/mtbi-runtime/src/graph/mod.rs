//! Rule graph, dependency resolution and execution plans.
//!
//! - [`RuleGraph`]: registered rules, keyed by name and by produced path
//! - [`Rule`]: a rule whose command template was checked against its slots
//! - [`ExecutionPlan`]: the ordered steps needed to produce a target

mod graph;
mod path;
mod plan;
mod rule;

pub use graph::RuleGraph;
pub use plan::{ExecutionPlan, PlanStep};
pub use rule::{Rule, RuleId};

/// Tracing target for graph operations.
const TRACING_TARGET: &str = "mtbi_runtime::graph";
