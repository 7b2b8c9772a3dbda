//! Subcommands of the `mtbi` binary.

mod list;
mod plan;
mod run;

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use mtbi_runtime::graph::RuleGraph;

use crate::config::Cli;

/// Operation to perform on the pipeline.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Lists every rule with its inputs and outputs.
    List,
    /// Prints the rules needed for a target, in order, without running them.
    Plan(TargetArgs),
    /// Runs the rules needed for a target.
    Run(RunArgs),
}

/// Target selection shared by `plan` and `run`.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// File to produce; defaults to the first output of the first rule.
    pub target: Option<PathBuf>,
}

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[clap(flatten)]
    pub target: TargetArgs,

    /// Writes the JSON run report to this file, even when a rule fails.
    #[arg(long, env = "MTBI_REPORT")]
    pub report: Option<PathBuf>,
}

impl TargetArgs {
    /// Returns the requested target or the graph's default one.
    fn resolve<'a>(&'a self, graph: &'a RuleGraph) -> anyhow::Result<&'a Path> {
        match &self.target {
            Some(target) => Ok(target),
            None => graph
                .default_target()
                .ok_or_else(|| anyhow::anyhow!("pipeline declares no outputs; pass a target")),
        }
    }
}

/// Runs the selected subcommand.
pub async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    let graph = cli.pipeline.load_graph()?;

    match &cli.command {
        Command::List => list::list(&graph, &mut std::io::stdout().lock()),
        Command::Plan(args) => {
            let target = args.resolve(&graph)?;
            plan::plan(&graph, target, &mut std::io::stdout().lock())
        }
        Command::Run(args) => {
            let engine = cli.engine.to_engine_config()?;
            run::run(&graph, args.target.resolve(&graph)?, engine, args.report.as_deref()).await
        }
    }
}
