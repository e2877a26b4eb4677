//! Point-in-time views of a graph for logs and debug tooling. Not meant to be machine-parsed
//! back into a graph.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use crate::{node::BadgeKind, BadgeError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub key: String,
    pub value: u64,
    pub kind: BadgeKind,
    pub has_checker: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub child: String,
    pub parent: String,
    /// The parent is not registered, so this edge carries nothing.
    pub dangling: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    /// Observer count per bound key, including keys that are not registered (yet).
    pub observers: BTreeMap<String, usize>,
    pub groups: BTreeMap<String, Vec<String>>,
    pub has_cycle: bool,
}

impl GraphSnapshot {
    pub fn to_json(&self) -> Result<String, BadgeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn value_of(&self, key: &str) -> Option<u64> {
        self.nodes
            .iter()
            .find(|node| node.key == key)
            .map(|node| node.value)
    }
}

impl Display for GraphSnapshot {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        writeln!(f, "=============== Badge Relations ===============")?;
        for edge in &self.edges {
            let parent_value = self.value_of(&edge.parent);
            match parent_value {
                Some(value) if !edge.dangling => {
                    writeln!(f, "{} -> {}: {}", edge.child, edge.parent, value)?
                }
                _ => writeln!(f, "{} -> {}: (unregistered)", edge.child, edge.parent)?,
            }
        }
        if self.has_cycle {
            writeln!(f, "!! relations contain a cycle")?;
        }

        writeln!(f, "=============== Badge Nodes ===============")?;
        for node in &self.nodes {
            writeln!(
                f,
                "key: {}, value: {}, kind: {}, checker: {}",
                node.key,
                node.value,
                node.kind,
                if node.has_checker { "yes" } else { "no" }
            )?;
        }

        writeln!(f, "=============== Badge Observers ===============")?;
        for (key, count) in &self.observers {
            writeln!(f, "key: {key}, observers: {count}")?;
        }

        if !self.groups.is_empty() {
            writeln!(f, "=============== Badge Groups ===============")?;
            for (group, keys) in &self.groups {
                writeln!(f, "{group}: {}", keys.join(", "))?;
            }
        }
        Ok(())
    }
}
