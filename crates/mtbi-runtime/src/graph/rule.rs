//! Validated rule representation.

use std::path::{Path, PathBuf};

use derive_more::{Debug, Display};

use crate::definition::{InputSource, ParamValue, RuleDefinition, Slots};
use crate::error::{PipelineError, PipelineResult};
use crate::template::{CommandTemplate, Section};

/// Identifier of a rule inside a [`super::RuleGraph`].
///
/// Ids are assigned in declaration order, so comparing two ids compares
/// their declaration positions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Debug, Display)]
#[debug("#{_0}")]
#[display("#{_0}")]
pub struct RuleId(usize);

impl RuleId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the declaration index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A rule whose command template has been checked against its slots.
#[derive(Debug, Clone)]
pub struct Rule {
    id: RuleId,
    name: String,
    inputs: Slots<InputSource>,
    outputs: Slots<PathBuf>,
    params: Slots<ParamValue>,
    template: CommandTemplate,
    log: Option<PathBuf>,
}

impl Rule {
    /// Validates a definition and assigns it an id.
    ///
    /// Every `{section.slot}` placeholder must name a slot the rule declares.
    pub(crate) fn compile(id: RuleId, def: RuleDefinition) -> PipelineResult<Self> {
        let template =
            CommandTemplate::parse(def.shell).map_err(|err| PipelineError::MalformedTemplate {
                rule: def.name.clone(),
                position: err.position,
                message: err.message,
            })?;

        for placeholder in template.placeholders() {
            let Some(slot) = &placeholder.slot else {
                continue;
            };
            let declared = match placeholder.section {
                Section::Input => def.input.contains(slot),
                Section::Output => def.output.contains(slot),
                Section::Params => def.params.contains(slot),
            };
            if !declared {
                return Err(PipelineError::UnresolvedPlaceholder {
                    rule: def.name,
                    section: placeholder.section,
                    slot: slot.clone(),
                });
            }
        }

        Ok(Self {
            id,
            name: def.name,
            inputs: def.input,
            outputs: def.output,
            params: def.params,
            template,
            log: def.log,
        })
    }

    /// Returns the rule id.
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Returns the rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared inputs.
    pub fn inputs(&self) -> &Slots<InputSource> {
        &self.inputs
    }

    /// Returns the declared outputs.
    pub fn outputs(&self) -> &Slots<PathBuf> {
        &self.outputs
    }

    /// Returns the declared parameters.
    pub fn params(&self) -> &Slots<ParamValue> {
        &self.params
    }

    /// Returns the command template.
    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    /// Returns the log file, if any.
    pub fn log(&self) -> Option<&Path> {
        self.log.as_deref()
    }

    /// Converts the rule back into its declaration.
    pub fn to_definition(&self) -> RuleDefinition {
        RuleDefinition {
            name: self.name.clone(),
            input: self.inputs.clone(),
            output: self.outputs.clone(),
            params: self.params.clone(),
            shell: self.template.as_str().to_owned(),
            log: self.log.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_accepts_declared_slots() {
        let def = RuleDefinition::new("a", "tool {input.i} {output.o} --n {params.n} {input}")
            .with_input("i", "in.txt")
            .with_output("o", "out.txt")
            .with_param("n", "3");
        let rule = Rule::compile(RuleId::new(0), def.clone()).unwrap();
        assert_eq!(rule.name(), "a");
        assert_eq!(rule.to_definition(), def);
    }

    #[test]
    fn test_compile_rejects_undeclared_param() {
        let def = RuleDefinition::new("D", "tool {params.arg1} {params.argZ}")
            .with_param("arg1", "value3")
            .with_param("arg2", "value4");
        let err = Rule::compile(RuleId::new(0), def).unwrap_err();
        match err {
            PipelineError::UnresolvedPlaceholder {
                rule,
                section,
                slot,
            } => {
                assert_eq!(rule, "D");
                assert_eq!(section, Section::Params);
                assert_eq!(slot, "argZ");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compile_rejects_cross_section_slot() {
        let def = RuleDefinition::new("a", "tool {output.i}").with_input("i", "in.txt");
        assert!(matches!(
            Rule::compile(RuleId::new(0), def),
            Err(PipelineError::UnresolvedPlaceholder {
                section: Section::Output,
                ..
            })
        ));
    }

    #[test]
    fn test_compile_reports_malformed_template() {
        let def = RuleDefinition::new("a", "tool {input.i");
        assert!(matches!(
            Rule::compile(RuleId::new(0), def),
            Err(PipelineError::MalformedTemplate { position: 5, .. })
        ));
    }
}
