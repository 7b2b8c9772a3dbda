//! Execution plans and backward dependency resolution.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use super::TRACING_TARGET;
use super::graph::RuleGraph;
use super::rule::{Rule, RuleId};
use crate::definition::Slots;
use crate::error::{PipelineError, PipelineResult};
use crate::template::{Bindings, Section};

/// A rule scheduled for execution, with its inputs bound to paths.
#[derive(Debug, Clone)]
pub struct PlanStep {
    rule: Arc<Rule>,
    inputs: Slots<PathBuf>,
}

impl PlanStep {
    /// Returns the scheduled rule.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Returns the rule name.
    pub fn name(&self) -> &str {
        self.rule.name()
    }

    /// Returns the inputs with upstream references replaced by paths.
    pub fn inputs(&self) -> &Slots<PathBuf> {
        &self.inputs
    }

    /// Returns the declared outputs.
    pub fn outputs(&self) -> &Slots<PathBuf> {
        self.rule.outputs()
    }

    /// Builds the substitution map for this step.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        for (slot, path) in self.inputs.iter() {
            bindings.insert(Section::Input, slot, path.to_string_lossy());
        }
        for (slot, path) in self.rule.outputs().iter() {
            bindings.insert(Section::Output, slot, path.to_string_lossy());
        }
        for (name, value) in self.rule.params().iter() {
            bindings.insert(Section::Params, name, value.as_str());
        }
        bindings
    }

    /// Renders the command line with every placeholder substituted.
    pub fn render_command(&self) -> PipelineResult<String> {
        self.rule
            .template()
            .render(&self.bindings())
            .map_err(|placeholder| PipelineError::UnresolvedPlaceholder {
                rule: self.rule.name().to_owned(),
                section: placeholder.section,
                slot: placeholder.slot.unwrap_or_default(),
            })
    }
}

/// An ordered sequence of rules that produces a target.
///
/// Every step comes after the steps producing its inputs; inputs without a
/// producing step existed on disk when the plan was built.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    target: PathBuf,
    workdir: PathBuf,
    steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    /// Returns the requested target path.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Returns the directory commands run in.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Returns the steps in execution order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns whether there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the rule names in execution order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.steps.iter().map(PlanStep::name).collect()
    }

    /// Resolves a declared path against the plan's working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        super::path::resolve(&self.workdir, path)
    }
}

impl RuleGraph {
    /// Computes the rules needed to produce `target`, in execution order.
    ///
    /// Resolution walks backward from the rule producing `target`. Each input
    /// resolves to its producing rule or, failing that, to an existing file.
    /// Independent rules keep their declaration order.
    ///
    /// A target that no rule produces yields an empty plan if the file
    /// already exists.
    pub fn build_plan(&self, target: impl AsRef<Path>) -> PipelineResult<ExecutionPlan> {
        let target = target.as_ref();
        let key = self.resolve(target);

        let mut resolver = Resolver::new(self);
        match self.producer_of(target) {
            Some(root) => resolver.visit(root.id())?,
            None if key.exists() => {}
            None => {
                return Err(PipelineError::NoProducer {
                    path: target.to_path_buf(),
                    required_by: None,
                });
            }
        }

        let order = resolver.forward_order()?;
        let mut inputs = resolver.inputs;
        let steps = order
            .into_iter()
            .filter_map(|id| {
                let rule = self.get(id)?.clone();
                let inputs = inputs.remove(&id).unwrap_or_default();
                Some(PlanStep { rule, inputs })
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            target: TRACING_TARGET,
            target_path = %target.display(),
            steps = steps.len(),
            "Execution plan built"
        );

        Ok(ExecutionPlan {
            target: target.to_path_buf(),
            workdir: self.workdir().to_path_buf(),
            steps,
        })
    }
}

/// Depth-first backward resolution state.
struct Resolver<'a> {
    graph: &'a RuleGraph,
    /// Rules on the current resolution chain, outermost first.
    chain: Vec<RuleId>,
    /// Rules on the current resolution chain, for constant-time lookup.
    resolving: HashSet<RuleId>,
    /// Fully resolved rules in post-order.
    resolved: Vec<RuleId>,
    /// Producer to consumer edges between resolved rules.
    edges: Vec<(RuleId, RuleId)>,
    /// Inputs of each resolved rule, bound to paths.
    inputs: HashMap<RuleId, Slots<PathBuf>>,
}

impl<'a> Resolver<'a> {
    fn new(graph: &'a RuleGraph) -> Self {
        Self {
            graph,
            chain: Vec::new(),
            resolving: HashSet::new(),
            resolved: Vec::new(),
            edges: Vec::new(),
            inputs: HashMap::new(),
        }
    }

    fn visit(&mut self, id: RuleId) -> PipelineResult<()> {
        if self.inputs.contains_key(&id) {
            return Ok(());
        }
        if self.resolving.contains(&id) {
            return Err(self.cycle_error(id));
        }

        let graph = self.graph;
        let Some(rule) = graph.get(id) else {
            return Ok(());
        };

        self.chain.push(id);
        self.resolving.insert(id);

        let mut bound = Slots::new();
        for (slot, source) in rule.inputs().iter() {
            let (path, producer) = graph.resolve_input(rule, slot, source)?;
            match producer {
                Some(producer) => {
                    self.edges.push((producer, id));
                    self.visit(producer)?;
                }
                None if graph.resolve(&path).exists() => {}
                None => {
                    return Err(PipelineError::NoProducer {
                        path,
                        required_by: Some(rule.name().to_owned()),
                    });
                }
            }
            bound.insert(slot, path);
        }

        self.chain.pop();
        self.resolving.remove(&id);
        self.inputs.insert(id, bound);
        self.resolved.push(id);
        Ok(())
    }

    fn cycle_error(&self, id: RuleId) -> PipelineError {
        let start = self.chain.iter().position(|c| *c == id).unwrap_or(0);
        let chain = self.chain[start..]
            .iter()
            .chain(std::iter::once(&id))
            .filter_map(|id| self.graph.get(*id))
            .map(|rule| rule.name().to_owned())
            .collect();
        PipelineError::CyclicDependency { chain }
    }

    /// Orders resolved rules producers-first, breaking ties by declaration order.
    fn forward_order(&self) -> PipelineResult<Vec<RuleId>> {
        let mut ids = self.resolved.clone();
        ids.sort_unstable();

        // Nodes are added in declaration order, so node indices compare like rule ids.
        let mut dag: DiGraph<RuleId, ()> = DiGraph::with_capacity(ids.len(), self.edges.len());
        let indices: HashMap<RuleId, NodeIndex> =
            ids.iter().map(|id| (*id, dag.add_node(*id))).collect();
        for (from, to) in &self.edges {
            if let (Some(from), Some(to)) = (indices.get(from), indices.get(to)) {
                dag.update_edge(*from, *to, ());
            }
        }

        let mut in_degree: HashMap<NodeIndex, usize> = dag
            .node_indices()
            .map(|n| (n, dag.neighbors_directed(n, Direction::Incoming).count()))
            .collect();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(n, _)| Reverse(*n))
            .collect();

        let mut order = Vec::with_capacity(ids.len());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(dag[node]);
            for next in dag.neighbors_directed(node, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(next));
                    }
                }
            }
        }

        if order.len() != ids.len() {
            let chain = ids
                .iter()
                .filter(|id| !order.contains(*id))
                .filter_map(|id| self.graph.get(*id))
                .map(|rule| rule.name().to_owned())
                .collect();
            return Err(PipelineError::CyclicDependency { chain });
        }
        Ok(order)
    }
}
