//! The `child -> parents` adjacency relation.
//!
//! Edges are stored by key and are not validated when inserted: a parent may be registered
//! after (or never) and propagation simply skips it. Removing a node does not scrub the edges
//! other children hold into it; [`EdgeStore::remove_child`] is the explicit cleanup hook.

use petgraph::{graphmap::GraphMap, Directed};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type KeyGraph<'a> = GraphMap<&'a str, (), Directed>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStore {
    parents: BTreeMap<String, BTreeSet<String>>,
}

impl EdgeStore {
    /// Returns false when the edge already existed.
    pub fn add_edge(&mut self, child: &str, parent: &str) -> bool {
        self.parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string())
    }

    pub fn add_edges<I, S>(&mut self, child: &str, parents: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for parent in parents {
            self.add_edge(child, parent.as_ref());
        }
    }

    /// Add `child -> parent` for every child listed under `parent`.
    pub fn add_reverse_edges<I, S>(&mut self, parent: &str, children: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for child in children {
            self.add_edge(child.as_ref(), parent);
        }
    }

    /// Drop every edge leaving `child`.
    pub fn remove_child(&mut self, child: &str) -> Option<BTreeSet<String>> {
        self.parents.remove(child)
    }

    pub fn parents_of(&self, child: &str) -> Vec<String> {
        self.parents
            .get(child)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn children_of(&self, parent: &str) -> Vec<String> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.contains(parent))
            .map(|(child, _)| child.clone())
            .collect()
    }

    pub fn contains_edge(&self, child: &str, parent: &str) -> bool {
        self.parents
            .get(child)
            .is_some_and(|parents| parents.contains(parent))
    }

    /// All edges as `(child, parent)` pairs, ordered by child then parent.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parents.iter().flat_map(|(child, parents)| {
            parents
                .iter()
                .map(move |parent| (child.as_str(), parent.as_str()))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.parents.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }

    pub fn clear(&mut self) {
        self.parents.clear();
    }

    /// Borrowed petgraph view of the relation, used by the cycle checks.
    pub fn as_graph(&self) -> KeyGraph<'_> {
        let mut graph = KeyGraph::new();
        for (child, parent) in self.iter() {
            graph.add_edge(child, parent, ());
        }
        graph
    }
}
