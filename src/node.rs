//! Badge nodes and the store that owns them.
//!
//! Nodes live in a key-addressed arena. Nothing outside the store ever holds a reference to a
//! node, so removing a key is enough to retire it: a later registration under the same key
//! always starts from zero.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter},
};

use crate::{checker::Checker, BadgeError};

/// How a badge interprets its own leaf input.
///
/// Deltas received from children are never normalized; the kind only applies to the value a
/// badge's checker (or [`crate::BadgeGraph::set_value`]) produces for the badge itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeKind {
    /// Contributes its full count.
    #[default]
    Count,
    /// Contributes 1 when it has anything at all, 0 otherwise.
    State,
}

impl BadgeKind {
    pub fn normalize(&self, value: u64) -> u64 {
        match self {
            BadgeKind::Count => value,
            BadgeKind::State => value.min(1),
        }
    }
}

impl Display for BadgeKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            BadgeKind::Count => write!(f, "count"),
            BadgeKind::State => write!(f, "state"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BadgeNode {
    pub(crate) key: String,
    pub(crate) checker: Option<Checker>,
    pub(crate) kind: BadgeKind,
    pub(crate) value: u64,
}

impl BadgeNode {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> BadgeKind {
        self.kind
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Static badges have no checker; their value is only ever pushed in.
    pub fn is_static(&self) -> bool {
        self.checker.is_none()
    }
}

/// Everything needed to register one badge.
///
/// ```
/// # use badge_graph::{BadgeGraph, BadgeKind, BadgeSpec, Checker};
/// let mut graph = BadgeGraph::new();
/// graph
///     .register_with(
///         BadgeSpec::new("mail")
///             .checker(Checker::new(|| 2))
///             .kind(BadgeKind::Count)
///             .group("hud")
///             .parent("main_menu"),
///     )
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct BadgeSpec {
    pub(crate) key: String,
    pub(crate) checker: Option<Checker>,
    pub(crate) kind: BadgeKind,
    pub(crate) groups: Vec<String>,
    pub(crate) parents: Vec<String>,
}

impl BadgeSpec {
    pub fn new(key: impl Into<String>) -> Self {
        BadgeSpec {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn checker(mut self, checker: Checker) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn kind(mut self, kind: BadgeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents.extend(parents.into_iter().map(Into::into));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: BTreeMap<String, BadgeNode>,
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl NodeStore {
    pub fn insert(
        &mut self,
        key: &str,
        checker: Option<Checker>,
        kind: BadgeKind,
        groups: &[String],
    ) -> Result<(), BadgeError> {
        if self.nodes.contains_key(key) {
            return Err(BadgeError::AlreadyRegistered(key.to_string()));
        }
        self.nodes.insert(
            key.to_string(),
            BadgeNode {
                key: key.to_string(),
                checker,
                kind,
                value: 0,
            },
        );
        for group in groups {
            self.groups
                .entry(group.clone())
                .or_default()
                .insert(key.to_string());
        }
        Ok(())
    }

    /// Remove a node along with its group memberships. Empty groups are dropped.
    pub fn remove(&mut self, key: &str) -> Option<BadgeNode> {
        let removed = self.nodes.remove(key);
        self.groups.retain(|_, members| {
            members.remove(key);
            !members.is_empty()
        });
        removed
    }

    /// Swap a node's checker, returning the previous one. Only used to drive a node to zero
    /// while it is being unregistered.
    pub(crate) fn replace_checker(
        &mut self,
        key: &str,
        checker: Option<Checker>,
    ) -> Option<Option<Checker>> {
        self.nodes
            .get_mut(key)
            .map(|node| std::mem::replace(&mut node.checker, checker))
    }

    pub fn get(&self, key: &str) -> Option<&BadgeNode> {
        self.nodes.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut BadgeNode> {
        self.nodes.get_mut(key)
    }

    pub fn value(&self, key: &str) -> u64 {
        self.nodes.get(key).map(|node| node.value).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BadgeNode> {
        self.nodes.values()
    }

    pub fn group_keys(&self, group: &str) -> Vec<String> {
        self.groups
            .get(group)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn groups(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.groups
    }

    pub fn reset_values(&mut self) {
        for node in self.nodes.values_mut() {
            node.value = 0;
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.groups.clear();
    }
}
