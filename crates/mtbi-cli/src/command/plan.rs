//! `mtbi plan`.

use std::io::Write;
use std::path::Path;

use mtbi_runtime::graph::RuleGraph;

use crate::TRACING_TARGET_COMMAND;

/// Writes the ordered rules needed for `target` with their commands.
pub(super) fn plan(graph: &RuleGraph, target: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    let plan = graph.build_plan(target)?;
    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        target_path = %target.display(),
        steps = plan.len(),
        "Plan built"
    );

    if plan.is_empty() {
        writeln!(out, "{} is up to date", target.display())?;
        return Ok(());
    }

    for (index, step) in plan.steps().iter().enumerate() {
        writeln!(out, "{}. {}", index + 1, step.name())?;
        writeln!(out, "   $ {}", step.render_command()?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fixtures;

    #[test]
    fn test_prints_steps_with_commands() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raw.fif"), "eeg").unwrap();
        let graph = fixtures::chain(dir.path());

        let mut out = Vec::new();
        plan(&graph, Path::new("out/filtered.fif"), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "1. read\n   $ cp raw.fif epochs.fif\n\
             2. filter\n   $ cat epochs.fif > out/filtered.fif\n"
        );
        assert!(!dir.path().join("epochs.fif").exists());
    }

    #[test]
    fn test_reports_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raw.fif"), "eeg").unwrap();
        let graph = fixtures::chain(dir.path());

        let mut out = Vec::new();
        plan(&graph, Path::new("raw.fif"), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "raw.fif is up to date\n");
    }

    #[test]
    fn test_fails_without_producer() {
        let dir = tempfile::tempdir().unwrap();
        let graph = fixtures::chain(dir.path());
        let mut out = Vec::new();
        assert!(plan(&graph, Path::new("out/filtered.fif"), &mut out).is_err());
    }
}
