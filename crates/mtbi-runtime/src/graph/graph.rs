//! Rule graph runtime representation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::TRACING_TARGET;
use super::path::resolve;
use super::rule::{Rule, RuleId};
use crate::definition::{InputSource, PipelineDefinition, RuleDefinition};
use crate::error::{PipelineError, PipelineResult};

/// A set of registered rules and the output paths they produce.
///
/// The graph is an explicit value: independent pipelines use independent
/// graphs. Dependency edges are not stored; they are derived from
/// output/input path matching when a plan is built.
#[derive(Debug, Clone)]
pub struct RuleGraph {
    /// Directory relative paths are resolved against.
    workdir: PathBuf,
    /// Registered rules in declaration order; `RuleId` indexes this vector.
    rules: Vec<Arc<Rule>>,
    /// Mapping from rule name to id.
    by_name: HashMap<String, RuleId>,
    /// Mapping from normalized output path to its producing rule.
    producers: HashMap<PathBuf, RuleId>,
}

impl RuleGraph {
    /// Creates an empty graph resolving paths against the current directory.
    pub fn new() -> Self {
        Self::with_workdir(".")
    }

    /// Creates an empty graph resolving paths against `workdir`.
    ///
    /// An empty `workdir` means the current directory.
    pub fn with_workdir(workdir: impl Into<PathBuf>) -> Self {
        let mut workdir = workdir.into();
        if workdir.as_os_str().is_empty() {
            workdir = PathBuf::from(".");
        }
        Self {
            workdir,
            rules: Vec::new(),
            by_name: HashMap::new(),
            producers: HashMap::new(),
        }
    }

    /// Registers every rule of a definition and validates references.
    ///
    /// `workdir` overrides the definition's own working directory.
    pub fn from_definition(
        def: PipelineDefinition,
        workdir: Option<PathBuf>,
    ) -> PipelineResult<Self> {
        let workdir = workdir.or(def.workdir).unwrap_or_else(|| PathBuf::from("."));
        let mut graph = Self::with_workdir(workdir);
        for rule in def.rules {
            graph.register(rule)?;
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Returns the working directory.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Returns the number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns whether no rule is registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Adds a rule declaration.
    ///
    /// Fails if the name is taken, if the command template is malformed or
    /// references an undeclared slot, or if one of the outputs is already
    /// produced by another rule. A failed registration leaves the graph
    /// unchanged.
    pub fn register(&mut self, def: RuleDefinition) -> PipelineResult<RuleId> {
        if self.by_name.contains_key(&def.name) {
            return Err(PipelineError::DuplicateRule(def.name));
        }

        let id = RuleId::new(self.rules.len());
        let rule = Rule::compile(id, def)?;

        let mut keys = Vec::with_capacity(rule.outputs().len());
        for path in rule.outputs().values() {
            let key = self.resolve(path);
            let producer = self.producers.get(&key).copied().or_else(|| {
                keys.contains(&key).then_some(id)
            });
            if let Some(producer) = producer {
                return Err(PipelineError::DuplicateOutput {
                    rule: rule.name().to_owned(),
                    path: path.clone(),
                    producer: self.name_of(producer).unwrap_or(rule.name()).to_owned(),
                });
            }
            keys.push(key);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            rule = rule.name(),
            id = %id,
            inputs = rule.inputs().len(),
            outputs = rule.outputs().len(),
            "Rule registered"
        );

        self.producers.extend(keys.into_iter().map(|key| (key, id)));
        self.by_name.insert(rule.name().to_owned(), id);
        self.rules.push(Arc::new(rule));
        Ok(id)
    }

    /// Returns a rule by id.
    pub fn get(&self, id: RuleId) -> Option<&Arc<Rule>> {
        self.rules.get(id.index())
    }

    /// Returns a rule by name.
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<Rule>> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Iterates over rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.iter()
    }

    /// Returns the rule producing `path`, if any.
    pub fn producer_of(&self, path: impl AsRef<Path>) -> Option<&Arc<Rule>> {
        let key = self.resolve(path.as_ref());
        self.producers.get(&key).and_then(|id| self.get(*id))
    }

    /// Returns the first output of the first declared rule.
    pub fn default_target(&self) -> Option<&Path> {
        self.rules
            .iter()
            .find_map(|rule| rule.outputs().values().next())
            .map(PathBuf::as_path)
    }

    /// Checks that every upstream reference names an existing rule output.
    pub fn validate(&self) -> PipelineResult<()> {
        for rule in &self.rules {
            for (slot, source) in rule.inputs().iter() {
                if let InputSource::Reference(_) = source {
                    self.resolve_input(rule, slot, source)?;
                }
            }
        }
        Ok(())
    }

    /// Resolves a declared path against the working directory.
    pub(crate) fn resolve(&self, path: &Path) -> PathBuf {
        resolve(&self.workdir, path)
    }

    /// Resolves an input slot to its declared path and its producer, if any.
    pub(crate) fn resolve_input(
        &self,
        rule: &Rule,
        slot: &str,
        source: &InputSource,
    ) -> PipelineResult<(PathBuf, Option<RuleId>)> {
        match source {
            InputSource::Path(path) => {
                let producer = self.producers.get(&self.resolve(path)).copied();
                Ok((path.clone(), producer))
            }
            InputSource::Reference(reference) => {
                let invalid = || PipelineError::InvalidReference {
                    rule: rule.name().to_owned(),
                    slot: slot.to_owned(),
                    target_rule: reference.rule.clone(),
                    output: reference.output.clone(),
                };
                let producer = self.get_by_name(&reference.rule).ok_or_else(invalid)?;
                let path = producer.outputs().get(&reference.output).ok_or_else(invalid)?;
                Ok((path.clone(), Some(producer.id())))
            }
        }
    }

    fn name_of(&self, id: RuleId) -> Option<&str> {
        self.get(id).map(|rule| rule.name())
    }
}

impl Default for RuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::RuleReference;
    use crate::template::Section;

    #[test]
    fn test_register_assigns_ids_in_order() {
        let mut graph = RuleGraph::new();
        let a = graph
            .register(RuleDefinition::new("A", "touch {output.o1}").with_output("o1", "x.pickle"))
            .unwrap();
        let b = graph
            .register(RuleDefinition::new("B", "touch {output.o2}").with_output("o2", "y.pickle"))
            .unwrap();
        assert!(a < b);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get_by_name("B").map(|r| r.id()), Some(b));
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let mut graph = RuleGraph::new();
        graph.register(RuleDefinition::new("A", "true")).unwrap();
        let err = graph.register(RuleDefinition::new("A", "false")).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateRule(name) if name == "A"));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_register_rejects_unresolved_placeholder() {
        let mut graph = RuleGraph::new();
        let err = graph
            .register(
                RuleDefinition::new("D", "script2.py {params.arg1} {params.argZ}")
                    .with_param("arg1", "value3")
                    .with_param("arg2", "value4"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnresolvedPlaceholder { section: Section::Params, ref slot, .. } if slot == "argZ"
        ));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_output() {
        let mut graph = RuleGraph::with_workdir("/work");
        graph
            .register(RuleDefinition::new("A", "true").with_output("o", "out/x.pickle"))
            .unwrap();
        let err = graph
            .register(RuleDefinition::new("B", "true").with_output("o", "./out/x.pickle"))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DuplicateOutput { ref producer, .. } if producer == "A"
        ));
        assert!(graph.get_by_name("B").is_none());
    }

    #[test]
    fn test_register_rejects_output_declared_twice_in_one_rule() {
        let mut graph = RuleGraph::new();
        let err = graph
            .register(
                RuleDefinition::new("A", "true")
                    .with_output("a", "x.txt")
                    .with_output("b", "x.txt"),
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateOutput { .. }));
    }

    #[test]
    fn test_producer_of_matches_normalized_paths() {
        let mut graph = RuleGraph::with_workdir("/work");
        graph
            .register(RuleDefinition::new("A", "true").with_output("o", "x.pickle"))
            .unwrap();
        assert_eq!(
            graph.producer_of("./sub/../x.pickle").map(|r| r.name()),
            Some("A")
        );
        assert_eq!(graph.producer_of("/work/x.pickle").map(|r| r.name()), Some("A"));
        assert!(graph.producer_of("y.pickle").is_none());
    }

    #[test]
    fn test_default_target_is_first_output() {
        let mut graph = RuleGraph::new();
        assert!(graph.default_target().is_none());
        graph.register(RuleDefinition::new("noop", "true")).unwrap();
        graph
            .register(RuleDefinition::new("all", "true").with_output("report", "report.html"))
            .unwrap();
        assert_eq!(graph.default_target(), Some(Path::new("report.html")));
    }

    #[test]
    fn test_validate_rejects_unknown_reference() {
        let mut graph = RuleGraph::new();
        graph
            .register(RuleDefinition::new("A", "true").with_output("o1", "x.pickle"))
            .unwrap();
        graph
            .register(
                RuleDefinition::new("B", "true")
                    .with_input("i1", RuleReference::new("A", "o9")),
            )
            .unwrap();
        assert!(matches!(
            graph.validate(),
            Err(PipelineError::InvalidReference { ref output, .. }) if output == "o9"
        ));
    }

    #[test]
    fn test_from_definition_uses_override_workdir() {
        let def = PipelineDefinition {
            workdir: Some("/from/file".into()),
            rules: vec![RuleDefinition::new("A", "true")],
        };
        let graph = RuleGraph::from_definition(def.clone(), None).unwrap();
        assert_eq!(graph.workdir(), Path::new("/from/file"));

        let graph = RuleGraph::from_definition(def, Some("/override".into())).unwrap();
        assert_eq!(graph.workdir(), Path::new("/override"));
    }
}
