//! Pipeline source configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mtbi_runtime::definition::PipelineDefinition;
use mtbi_runtime::graph::RuleGraph;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Where the rule definitions live.
///
/// # Environment Variables
///
/// - `MTBI_PIPELINE` - Pipeline file, TOML or JSON (default: pipeline.toml)
/// - `MTBI_WORKDIR` - Working directory overriding the file's own setting
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct PipelineConfig {
    /// Pipeline definition file; the format follows the extension.
    #[arg(
        short = 'f',
        long = "file",
        env = "MTBI_PIPELINE",
        default_value = "pipeline.toml",
        global = true
    )]
    pub file: PathBuf,

    /// Directory relative paths and commands are resolved against.
    ///
    /// Defaults to the `workdir` in the pipeline file, or the file's directory.
    #[arg(long, env = "MTBI_WORKDIR", global = true)]
    pub workdir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Reads the pipeline file and builds its rule graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// rules fail validation.
    pub fn load_graph(&self) -> anyhow::Result<RuleGraph> {
        let definition = PipelineDefinition::from_path(&self.file)
            .with_context(|| format!("failed to load pipeline {}", self.file.display()))?;
        let graph = RuleGraph::from_definition(definition, self.workdir.clone())?;

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            file = %self.file.display(),
            workdir = %graph.workdir().display(),
            rules = graph.len(),
            "Pipeline loaded"
        );
        Ok(graph)
    }

    /// Logs the pipeline source at debug level.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            file = %self.file.display(),
            workdir = ?self.workdir,
            "Pipeline configuration"
        );
    }
}
