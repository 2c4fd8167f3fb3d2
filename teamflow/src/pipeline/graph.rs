//! The static stage dependency graph.
//!
//! The graph is built once from a dependency table and never mutated.
//! Ordering is deterministic: among stages that are ready at the same
//! time, the one declared first wins.

use crate::core::StageId;
use crate::errors::{CycleDetectedError, GraphValidationError};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A directed acyclic graph over stage identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageGraph {
    /// Stages in declaration order with their dependencies.
    nodes: Vec<(StageId, Vec<StageId>)>,
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::standard()
    }
}

impl StageGraph {
    /// The eight-stage team graph.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            nodes: StageId::ALL
                .into_iter()
                .map(|s| (s, s.dependencies().to_vec()))
                .collect(),
        }
    }

    /// Builds a graph from an explicit dependency table.
    ///
    /// # Errors
    ///
    /// Fails if a stage is declared twice, depends on itself, depends on an
    /// undeclared stage, or participates in a cycle.
    pub fn from_edges(edges: Vec<(StageId, Vec<StageId>)>) -> Result<Self, GraphValidationError> {
        let mut declared = HashSet::new();
        for (stage, _) in &edges {
            if !declared.insert(*stage) {
                return Err(GraphValidationError::new(format!(
                    "Stage '{stage}' is declared more than once"
                ))
                .with_stages(vec![stage.to_string()]));
            }
        }

        for (stage, deps) in &edges {
            if deps.contains(stage) {
                return Err(GraphValidationError::new(format!(
                    "Stage '{stage}' cannot depend on itself"
                ))
                .with_stages(vec![stage.to_string()]));
            }
            if let Some(missing) = deps.iter().find(|d| !declared.contains(*d)) {
                return Err(GraphValidationError::new(format!(
                    "Stage '{stage}' depends on undeclared stage '{missing}'"
                ))
                .with_stages(vec![stage.to_string(), missing.to_string()]));
            }
        }

        let graph = Self { nodes: edges };
        graph.detect_cycle()?;
        Ok(graph)
    }

    /// Returns the dependencies of a stage (empty if undeclared).
    #[must_use]
    pub fn dependencies(&self, stage: StageId) -> &[StageId] {
        self.nodes
            .iter()
            .find(|(s, _)| *s == stage)
            .map_or(&[], |(_, deps)| deps.as_slice())
    }

    /// Returns the declared stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> Vec<StageId> {
        self.nodes.iter().map(|(s, _)| *s).collect()
    }

    /// Returns true if the stage is declared.
    #[must_use]
    pub fn contains(&self, stage: StageId) -> bool {
        self.nodes.iter().any(|(s, _)| *s == stage)
    }

    fn declaration_index(&self) -> HashMap<StageId, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, (s, _))| (*s, i))
            .collect()
    }

    /// Adds every transitive dependency of `stages` to the set.
    #[must_use]
    pub fn closure(&self, stages: &[StageId]) -> Vec<StageId> {
        let mut included: HashSet<StageId> = HashSet::new();
        let mut stack: Vec<StageId> = stages.iter().copied().filter(|s| self.contains(*s)).collect();
        while let Some(stage) = stack.pop() {
            if included.insert(stage) {
                stack.extend(self.dependencies(stage).iter().copied());
            }
        }
        self.stages()
            .into_iter()
            .filter(|s| included.contains(s))
            .collect()
    }

    /// Topological order of `subset`, with declaration order as tie-break.
    ///
    /// Dependencies outside the subset are ignored; callers that need them
    /// should pass the subset through [`StageGraph::closure`] first.
    #[must_use]
    pub fn topological_order(&self, subset: &[StageId]) -> Vec<StageId> {
        let index = self.declaration_index();
        let members: HashSet<StageId> = subset.iter().copied().filter(|s| self.contains(*s)).collect();

        let mut in_degree: HashMap<StageId, usize> = members
            .iter()
            .map(|s| {
                let count = self
                    .dependencies(*s)
                    .iter()
                    .filter(|d| members.contains(d))
                    .count();
                (*s, count)
            })
            .collect();

        // Ready set keyed by declaration index keeps the pick deterministic.
        let mut ready: BTreeSet<(usize, StageId)> = in_degree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(s, _)| (index[s], *s))
            .collect();

        let mut order = Vec::with_capacity(members.len());
        while let Some(entry) = ready.pop_first() {
            let (_, stage) = entry;
            order.push(stage);
            for dependent in self.direct_dependents(stage) {
                if let Some(count) = in_degree.get_mut(&dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert((index[&dependent], dependent));
                    }
                }
            }
        }

        order
    }

    /// Stages that list `stage` as a direct dependency.
    #[must_use]
    pub fn direct_dependents(&self, stage: StageId) -> Vec<StageId> {
        self.nodes
            .iter()
            .filter(|(_, deps)| deps.contains(&stage))
            .map(|(s, _)| *s)
            .collect()
    }

    fn detect_cycle(&self) -> Result<(), CycleDetectedError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            graph: &StageGraph,
            node: StageId,
            marks: &mut HashMap<StageId, Mark>,
            path: &mut Vec<StageId>,
        ) -> Result<(), CycleDetectedError> {
            match marks.get(&node) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|s| *s == node).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
                    cycle.push(node.to_string());
                    return Err(CycleDetectedError::new(cycle));
                }
                None => {}
            }

            marks.insert(node, Mark::Visiting);
            path.push(node);
            for dep in graph.dependencies(node) {
                visit(graph, *dep, marks, path)?;
            }
            path.pop();
            marks.insert(node, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        let mut path = Vec::new();
        for stage in self.stages() {
            visit(self, stage, &mut marks, &mut path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_graph_is_valid() {
        let graph = StageGraph::standard();
        let edges: Vec<_> = graph
            .stages()
            .into_iter()
            .map(|s| (s, graph.dependencies(s).to_vec()))
            .collect();
        assert!(StageGraph::from_edges(edges).is_ok());
    }

    #[test]
    fn test_full_order_is_declaration_order() {
        let graph = StageGraph::standard();
        assert_eq!(graph.topological_order(&StageId::ALL), StageId::ALL.to_vec());
    }

    #[test]
    fn test_order_ignores_input_permutation() {
        let graph = StageGraph::standard();
        let mut shuffled = StageId::ALL.to_vec();
        shuffled.reverse();
        assert_eq!(graph.topological_order(&shuffled), StageId::ALL.to_vec());
    }

    #[test]
    fn test_tie_break_uses_declaration_not_alphabet() {
        // Analysis and research are independent; analysis is declared first.
        let graph = StageGraph::standard();
        let order = graph.topological_order(&[
            StageId::Documentation,
            StageId::Research,
            StageId::Analysis,
        ]);
        assert_eq!(order, vec![StageId::Analysis, StageId::Research, StageId::Documentation]);
    }

    #[test]
    fn test_closure_adds_ancestors() {
        let graph = StageGraph::standard();
        let closure = graph.closure(&[StageId::Qa]);
        assert_eq!(
            closure,
            vec![
                StageId::Analysis,
                StageId::Research,
                StageId::Architecture,
                StageId::Planning,
                StageId::Implementation,
                StageId::Qa,
            ]
        );
    }

    #[test]
    fn test_cycle_detection() {
        let result = StageGraph::from_edges(vec![
            (StageId::Analysis, vec![StageId::Research]),
            (StageId::Research, vec![StageId::Analysis]),
        ]);
        let err = result.unwrap_err();
        assert!(err.message.contains("Cycle detected"));
        assert_eq!(err.stages.first(), err.stages.last());
    }

    #[test]
    fn test_self_dependency_rejected() {
        let err = StageGraph::from_edges(vec![(StageId::Analysis, vec![StageId::Analysis])])
            .unwrap_err();
        assert!(err.message.contains("cannot depend on itself"));
    }

    #[test]
    fn test_undeclared_dependency_rejected() {
        let err = StageGraph::from_edges(vec![(StageId::Planning, vec![StageId::Architecture])])
            .unwrap_err();
        assert!(err.message.contains("undeclared"));
    }
}
