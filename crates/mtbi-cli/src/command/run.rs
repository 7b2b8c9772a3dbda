//! `mtbi run`.

use std::path::Path;

use anyhow::Context;
use mtbi_runtime::engine::{Engine, EngineConfig, ExecutionReport, RuleState};
use mtbi_runtime::graph::RuleGraph;

use crate::TRACING_TARGET_COMMAND;

/// Runs the rules needed for `target`, optionally saving the run report.
pub(super) async fn run(
    graph: &RuleGraph,
    target: &Path,
    config: EngineConfig,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    let plan = graph.build_plan(target)?;
    let engine = Engine::new(config);
    let report = engine.run(&plan).await?;

    if let Some(path) = report_path {
        write_report(&report, path)?;
    }

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        run_id = %report.run_id,
        succeeded = report.count(RuleState::Succeeded),
        failed = report.count(RuleState::Failed),
        skipped = report.count(RuleState::Pending),
        "Run finished"
    );

    report.into_result()?;
    Ok(())
}

fn write_report(report: &ExecutionReport, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write run report {}", path.display()))?;

    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        path = %path.display(),
        "Run report written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use mtbi_runtime::PipelineError;

    use super::*;
    use crate::command::fixtures;

    #[tokio::test]
    async fn test_runs_chain_and_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raw.fif"), "eeg").unwrap();
        let graph = fixtures::chain(dir.path());
        let report_path = dir.path().join("report.json");

        run(
            &graph,
            Path::new("out/filtered.fif"),
            EngineConfig::default(),
            Some(&report_path),
        )
        .await
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/filtered.fif")).unwrap(),
            "eeg"
        );
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["rules"][0]["rule"], "read");
        assert_eq!(report["rules"][1]["state"], "succeeded");
    }

    #[tokio::test]
    async fn test_failed_run_still_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raw.fif"), "eeg").unwrap();
        let graph = fixtures::chain(dir.path());
        let report_path = dir.path().join("report.json");
        let config = EngineConfig::builder().shell("false").build().unwrap();

        let err = run(&graph, Path::new("out/filtered.fif"), config, Some(&report_path))
            .await
            .unwrap_err();

        let failure = err
            .downcast_ref::<PipelineError>()
            .and_then(PipelineError::as_rule_failure)
            .unwrap();
        assert_eq!(failure.rule, "read");

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["rules"][0]["state"], "failed");
        assert_eq!(report["rules"][1]["state"], "pending");
        assert_eq!(report["failure"]["rule"], "read");
    }
}
