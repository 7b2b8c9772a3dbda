//! Rule execution engine.

use std::path::{Path, PathBuf};
use std::time::Instant;

use jiff::Timestamp;

use super::command::{self, Finished};
use super::failure::{FailureReason, RuleFailure};
use super::report::{ExecutionReport, RuleReport};
use super::state::RuleState;
use super::{EngineConfig, TRACING_TARGET};
use crate::error::PipelineResult;
use crate::graph::{ExecutionPlan, PlanStep};

/// The rule execution engine.
///
/// Executes plan steps strictly one after another: a rule starts only
/// after the previous rule's command has finished and its outputs were
/// verified. The first failure aborts the rest of the plan; outputs of
/// rules that already succeeded stay on disk.
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        tracing::info!(
            target: TRACING_TARGET,
            shell = %config.shell,
            rule_timeout_secs = config.rule_timeout.map(|t| t.as_secs()),
            "Rule engine initialized"
        );

        Self { config }
    }

    /// Creates a new engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes a plan and fails with [`crate::PipelineError::RuleExecution`]
    /// if any rule fails.
    pub async fn execute(&self, plan: &ExecutionPlan) -> PipelineResult<ExecutionReport> {
        self.run(plan).await?.into_result()
    }

    /// Executes a plan and returns the report whether or not a rule failed.
    ///
    /// Only internal errors (an illegal state transition) are returned as
    /// `Err`; a failed rule is recorded in [`ExecutionReport::failure`].
    pub async fn run(&self, plan: &ExecutionPlan) -> PipelineResult<ExecutionReport> {
        let rules = plan
            .steps()
            .iter()
            .map(|step| RuleReport::pending(step.name()))
            .collect();
        let mut report = ExecutionReport::new(plan.target().to_path_buf(), rules);

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %report.run_id,
            target_path = %plan.target().display(),
            steps = plan.len(),
            "Starting plan execution"
        );

        for (step, rule_report) in plan.steps().iter().zip(report.rules.iter_mut()) {
            if let Err(failure) = self.run_step(plan, step, rule_report).await? {
                tracing::error!(
                    target: TRACING_TARGET,
                    rule = step.name(),
                    reason = %failure.reason,
                    exit_code = failure.exit_code,
                    "Rule failed, aborting remaining plan"
                );
                report.failure = Some(failure);
                break;
            }
        }

        report.finished_at = Some(Timestamp::now());

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %report.run_id,
            succeeded = report.count(RuleState::Succeeded),
            failed = report.count(RuleState::Failed),
            skipped = report.count(RuleState::Pending),
            "Plan execution finished"
        );

        Ok(report)
    }

    /// Runs one step through `Pending → Ready → Running → Succeeded | Failed`.
    async fn run_step(
        &self,
        plan: &ExecutionPlan,
        step: &PlanStep,
        report: &mut RuleReport,
    ) -> PipelineResult<Result<(), RuleFailure>> {
        let rule = step.name();

        let missing = missing_paths(plan, step.inputs().values()).await;
        if !missing.is_empty() {
            report.transition(RuleState::Failed)?;
            return Ok(Err(RuleFailure::new(
                rule,
                FailureReason::MissingInputs { paths: missing },
            )));
        }
        report.transition(RuleState::Ready)?;

        let command = match step.render_command() {
            Ok(command) => command,
            Err(err) => {
                report.transition(RuleState::Running)?;
                report.transition(RuleState::Failed)?;
                let reason = FailureReason::InvalidCommand {
                    message: err.to_string(),
                };
                return Ok(Err(RuleFailure::new(rule, reason)));
            }
        };
        report.command = Some(command.clone());

        report.transition(RuleState::Running)?;
        tracing::info!(
            target: TRACING_TARGET,
            rule,
            command = %command,
            "Running rule"
        );

        let started = Instant::now();
        let outcome = self.run_command(plan, step, &command).await;
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(()) => {
                report.exit_code = Some(0);
                report.transition(RuleState::Succeeded)?;
                tracing::info!(
                    target: TRACING_TARGET,
                    rule,
                    duration_ms = report.duration_ms,
                    "Rule succeeded"
                );
                Ok(Ok(()))
            }
            Err(failure) => {
                report.exit_code = failure.exit_code;
                report.transition(RuleState::Failed)?;
                Ok(Err(failure.with_command(command)))
            }
        }
    }

    /// Prepares directories, runs the command, writes the log and checks outputs.
    async fn run_command(
        &self,
        plan: &ExecutionPlan,
        step: &PlanStep,
        command: &str,
    ) -> Result<(), RuleFailure> {
        let rule = step.name();
        let log = step.rule().log().map(|path| plan.resolve(path));

        if self.config.create_output_dirs {
            let outputs = step.outputs().values().map(|path| plan.resolve(path));
            for path in outputs.chain(log.clone()) {
                create_parent(&path)
                    .await
                    .map_err(|reason| RuleFailure::new(rule, reason))?;
            }
        }

        let finished = command::run(&self.config, plan.workdir(), command)
            .await
            .map_err(|reason| RuleFailure::new(rule, reason))?;

        if let Some(log) = &log {
            write_log(log, &finished)
                .await
                .map_err(|reason| RuleFailure::new(rule, reason))?;
        }

        let stderr = command::tail(&finished.stderr, self.config.stderr_tail_bytes);
        if let Some(reason) = finished.failure_reason() {
            return Err(RuleFailure::new(rule, reason).with_output(finished.exit_code, stderr));
        }

        let missing = missing_paths(plan, step.outputs().values()).await;
        if !missing.is_empty() {
            return Err(
                RuleFailure::new(rule, FailureReason::MissingOutputs { paths: missing })
                    .with_output(finished.exit_code, stderr),
            );
        }

        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish()
    }
}

/// Returns the declared paths that do not exist on disk.
async fn missing_paths<'a>(
    plan: &ExecutionPlan,
    paths: impl Iterator<Item = &'a PathBuf>,
) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    for path in paths {
        let exists = tokio::fs::try_exists(plan.resolve(path))
            .await
            .unwrap_or(false);
        if !exists {
            missing.push(path.clone());
        }
    }
    missing
}

async fn create_parent(path: &Path) -> Result<(), FailureReason> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|err| FailureReason::Filesystem {
            message: format!("cannot create {}: {err}", parent.display()),
        })
}

/// Writes stdout followed by stderr, the way a redirected `> log 2>&1` would.
async fn write_log(path: &Path, finished: &Finished) -> Result<(), FailureReason> {
    let mut contents = Vec::with_capacity(finished.stdout.len() + finished.stderr.len());
    contents.extend_from_slice(&finished.stdout);
    contents.extend_from_slice(&finished.stderr);
    tokio::fs::write(path, contents)
        .await
        .map_err(|err| FailureReason::Filesystem {
            message: format!("cannot write log {}: {err}", path.display()),
        })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::PipelineError;
    use crate::definition::{RuleDefinition, RuleReference};
    use crate::graph::RuleGraph;

    fn two_rule_graph(dir: &Path, first_command: &str) -> RuleGraph {
        let mut graph = RuleGraph::with_workdir(dir);
        graph
            .register(RuleDefinition::new("A", first_command).with_output("o1", "x.pickle"))
            .unwrap();
        graph
            .register(
                RuleDefinition::new("B", "cp {input.i1} {output.o2}")
                    .with_input("i1", RuleReference::new("A", "o1"))
                    .with_output("o2", "y.pickle"),
            )
            .unwrap();
        graph
    }

    #[tokio::test]
    async fn test_execute_runs_chain_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let graph = two_rule_graph(dir.path(), "printf eeg > {output.o1}");
        let plan = graph.build_plan("y.pickle").unwrap();

        let report = Engine::with_defaults().execute(&plan).await.unwrap();
        assert!(report.succeeded());
        assert_eq!(report.state_of("A"), Some(RuleState::Succeeded));
        assert_eq!(report.state_of("B"), Some(RuleState::Succeeded));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("y.pickle")).unwrap(),
            "eeg"
        );
        assert_eq!(
            report.rules[1].command.as_deref(),
            Some("cp x.pickle y.pickle")
        );
    }

    #[tokio::test]
    async fn test_failing_rule_aborts_plan() {
        let dir = tempfile::tempdir().unwrap();
        let graph = two_rule_graph(dir.path(), "echo broken >&2; exit 1");
        let plan = graph.build_plan("y.pickle").unwrap();

        let engine = Engine::with_defaults();
        let report = engine.run(&plan).await.unwrap();
        assert_eq!(report.state_of("A"), Some(RuleState::Failed));
        assert_eq!(report.state_of("B"), Some(RuleState::Pending));
        assert!(!dir.path().join("y.pickle").exists());

        let err = engine.execute(&plan).await.unwrap_err();
        let PipelineError::RuleExecution(failure) = err else {
            panic!("expected a rule execution error");
        };
        assert_eq!(failure.rule, "A");
        assert_eq!(failure.exit_code, Some(1));
        assert_eq!(failure.reason, FailureReason::ExitStatus { code: 1 });
        assert_eq!(failure.command.as_deref(), Some("echo broken >&2; exit 1"));
        assert_eq!(failure.stderr, "broken");
    }

    #[tokio::test]
    async fn test_missing_declared_output_fails_rule() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RuleGraph::with_workdir(dir.path());
        graph
            .register(RuleDefinition::new("lazy", "true").with_output("o", "never.txt"))
            .unwrap();
        let plan = graph.build_plan("never.txt").unwrap();

        let err = Engine::with_defaults().execute(&plan).await.unwrap_err();
        let failure = err.as_rule_failure().unwrap();
        assert_eq!(
            failure.reason,
            FailureReason::MissingOutputs {
                paths: vec![PathBuf::from("never.txt")]
            }
        );
    }

    #[tokio::test]
    async fn test_input_removed_after_planning_fails_ready_check() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.fif");
        std::fs::write(&raw, b"raw").unwrap();
        let mut graph = RuleGraph::with_workdir(dir.path());
        graph
            .register(
                RuleDefinition::new("read", "cp {input.raw} {output.o}")
                    .with_input("raw", "raw.fif")
                    .with_output("o", "x.pickle"),
            )
            .unwrap();
        let plan = graph.build_plan("x.pickle").unwrap();
        std::fs::remove_file(&raw).unwrap();

        let report = Engine::with_defaults().run(&plan).await.unwrap();
        assert_eq!(report.state_of("read"), Some(RuleState::Failed));
        let failure = report.failure.unwrap();
        assert!(matches!(failure.reason, FailureReason::MissingInputs { .. }));
        assert!(failure.command.is_none());
    }

    #[tokio::test]
    async fn test_log_receives_output_and_dirs_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RuleGraph::with_workdir(dir.path());
        graph
            .register(
                RuleDefinition::new(
                    "maxfilter",
                    "echo filtering; echo warning >&2; printf done > {output.tsss}",
                )
                .with_output("tsss", "derivatives/sub-01/tsss.fif")
                .with_log("logs/sub-01/maxfilter.log"),
            )
            .unwrap();
        let plan = graph.build_plan("derivatives/sub-01/tsss.fif").unwrap();

        Engine::with_defaults().execute(&plan).await.unwrap();
        let log =
            std::fs::read_to_string(dir.path().join("logs/sub-01/maxfilter.log")).unwrap();
        assert_eq!(log, "filtering\nwarning\n");
        assert!(dir.path().join("derivatives/sub-01/tsss.fif").exists());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RuleGraph::with_workdir(dir.path());
        graph
            .register(
                RuleDefinition::new("write", "printf {params.value} > {output.o}")
                    .with_output("o", "out.txt")
                    .with_param("value", "same"),
            )
            .unwrap();
        let plan = graph.build_plan("out.txt").unwrap();
        let engine = Engine::with_defaults();

        engine.execute(&plan).await.unwrap();
        engine.execute(&plan).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "same"
        );
    }

    #[tokio::test]
    async fn test_timeout_fails_rule() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RuleGraph::with_workdir(dir.path());
        graph
            .register(
                RuleDefinition::new(
                    "slow",
                    "echo loading; echo warn >&2; sleep 5; touch {output.o}",
                )
                .with_output("o", "slow.txt")
                .with_log("logs/slow.log"),
            )
            .unwrap();
        let plan = graph.build_plan("slow.txt").unwrap();
        let engine = Engine::new(
            EngineConfig::builder()
                .rule_timeout(Duration::from_millis(200))
                .build()
                .unwrap(),
        );

        let report = engine.run(&plan).await.unwrap();
        let failure = report.failure.unwrap();
        assert!(matches!(failure.reason, FailureReason::TimedOut { .. }));
        assert_eq!(failure.stderr, "warn");
        assert_eq!(report.rules[0].state, RuleState::Failed);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("logs/slow.log")).unwrap(),
            "loading\nwarn\n"
        );
    }

    #[tokio::test]
    async fn test_empty_workdir_runs_in_current_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.txt");
        let def = crate::definition::PipelineDefinition {
            workdir: Some(PathBuf::new()),
            rules: vec![RuleDefinition::new("a", "touch {output.o}").with_output("o", &output)],
        };
        let graph = RuleGraph::from_definition(def, None).unwrap();
        assert_eq!(graph.workdir(), Path::new("."));

        let plan = graph.build_plan(&output).unwrap();
        let report = Engine::with_defaults().execute(&plan).await.unwrap();
        assert_eq!(report.state_of("a"), Some(RuleState::Succeeded));
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_empty_plan_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exists.txt"), b"").unwrap();
        let graph = RuleGraph::with_workdir(dir.path());
        let plan = graph.build_plan("exists.txt").unwrap();

        let report = Engine::with_defaults().execute(&plan).await.unwrap();
        assert!(report.rules.is_empty());
        assert!(report.finished_at.is_some());
    }
}
