//! `mtbi list`.

use std::io::Write;

use mtbi_runtime::definition::InputSource;
use mtbi_runtime::graph::RuleGraph;

/// Writes every rule with its inputs and outputs in declaration order.
pub(super) fn list(graph: &RuleGraph, out: &mut impl Write) -> anyhow::Result<()> {
    for rule in graph.rules() {
        writeln!(out, "{}", rule.name())?;
        for (slot, source) in rule.inputs().iter() {
            match source {
                InputSource::Path(path) => writeln!(out, "  input.{slot}: {}", path.display())?,
                InputSource::Reference(reference) => {
                    writeln!(out, "  input.{slot}: <- {reference}")?
                }
            }
        }
        for (slot, path) in rule.outputs().iter() {
            writeln!(out, "  output.{slot}: {}", path.display())?;
        }
    }
    Ok(())
}
