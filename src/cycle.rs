//! Whole-graph cycle checks.
//!
//! These are advisory: propagation guards itself against cycles at runtime, so a graph that
//! fails these checks still settles, it just under-propagates along the cyclic edges.

use petgraph::{
    algo::kosaraju_scc,
    visit::{depth_first_search, Control, DfsEvent},
};

use crate::{diagnostic::Diagnostic, edges::EdgeStore, node::NodeStore};

pub struct CycleDetector<'a> {
    edges: &'a EdgeStore,
}

impl<'a> CycleDetector<'a> {
    pub fn new(edges: &'a EdgeStore) -> Self {
        CycleDetector { edges }
    }

    /// Depth-first search over every edge; any back edge (self-loops included) is a cycle.
    pub fn has_cycle(&self) -> bool {
        let graph = self.edges.as_graph();
        let starts: Vec<&str> = graph.nodes().collect();
        let result = depth_first_search(&graph, starts, |event| match event {
            DfsEvent::BackEdge(_, _) => Control::Break(()),
            _ => Control::Continue,
        });
        matches!(result, Control::Break(()))
    }

    /// Each group of keys that reach one another, sorted.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let graph = self.edges.as_graph();
        let mut cycles: Vec<Vec<String>> = kosaraju_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut keys: Vec<String> = scc.into_iter().map(str::to_string).collect();
                keys.sort();
                keys
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Cycles plus every edge touching an unregistered key.
    pub fn validate(&self, nodes: &NodeStore) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = self
            .cycles()
            .into_iter()
            .map(|path| Diagnostic::Cycle {
                key: path[0].clone(),
                path,
            })
            .collect();

        for (child, parent) in self.edges.iter() {
            if !nodes.contains(child) {
                diagnostics.push(Diagnostic::MissingChild {
                    child: child.to_string(),
                    parent: parent.to_string(),
                });
            }
            if !nodes.contains(parent) {
                diagnostics.push(Diagnostic::MissingParent {
                    child: child.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        diagnostics
    }
}
