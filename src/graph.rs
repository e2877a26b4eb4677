//! The propagation engine.
//!
//! A [`BadgeGraph`] owns the node arena, the `child -> parents` relation and the observer
//! lists. Values only change in two ways:
//!
//! 1. A refresh re-runs one badge's checker (or a static badge is given a value with
//!    [`BadgeGraph::set_value`]). Only that badge is recomputed from its source.
//! 2. The signed difference from step 1 is then added, unchanged, to every ancestor reachable
//!    over the relation. Ancestors are never recomputed from their children; their value is
//!    the running sum of every delta they have received.
//!
//! Reads ([`BadgeGraph::get_value`]) never run a checker, so a UI may poll freely without
//! triggering side effects or propagation.
//!
//! # Cycles and depth
//!
//! The relation is expected to be acyclic but the walk does not rely on it. Every refresh keeps
//! its own `visited` set, so each badge is updated at most once per refresh however many paths
//! reach it. Reaching a badge again along the current descent path is reported as a
//! [`Diagnostic::Cycle`]. The walk uses an explicit stack bounded by `max_depth`; anything
//! deeper is reported as [`Diagnostic::DepthExceeded`] and left untouched.

use serde::Serialize;
use std::{collections::BTreeSet, sync::mpsc::Sender};

use crate::{
    checker::Checker,
    config::GraphConfig,
    cycle::CycleDetector,
    diagnostic::{Diagnostic, DiagnosticLog},
    edges::EdgeStore,
    event::BadgeEvent,
    node::{BadgeKind, BadgeNode, BadgeSpec, NodeStore},
    observer::{Observer, ObserverRegistry, PendingNotifications},
    snapshot::{EdgeSnapshot, GraphSnapshot, NodeSnapshot},
    BadgeError,
};

/// What one refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    /// The badge whose refresh was requested.
    pub key: String,
    /// Signed change applied to `key` and carried to its ancestors. Zero when nothing changed.
    pub delta: i64,
    /// Every badge touched, in walk order, with its new value.
    pub changed: Vec<(String, u64)>,
}

impl RefreshOutcome {
    fn unchanged(key: &str) -> Self {
        RefreshOutcome {
            key: key.to_string(),
            ..Default::default()
        }
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn value_of(&self, key: &str) -> Option<u64> {
        self.changed
            .iter()
            .find(|(changed, _)| changed == key)
            .map(|(_, value)| *value)
    }
}

struct Frame {
    key: String,
    parents: Vec<String>,
    next: usize,
}

pub struct BadgeGraph {
    nodes: NodeStore,
    edges: EdgeStore,
    observers: ObserverRegistry,
    diagnostics: DiagnosticLog,
    max_depth: usize,
    events: Option<Sender<BadgeEvent>>,
    /// Dangling `(child, parent)` relations already reported by a walk.
    reported_missing: BTreeSet<(String, String)>,
}

impl Default for BadgeGraph {
    fn default() -> Self {
        BadgeGraph::new()
    }
}

impl std::fmt::Debug for BadgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BadgeGraph")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.edge_count())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl BadgeGraph {
    pub fn new() -> Self {
        let config = GraphConfig::default();
        BadgeGraph {
            nodes: NodeStore::default(),
            edges: EdgeStore::default(),
            observers: ObserverRegistry::default(),
            diagnostics: DiagnosticLog::new(config.diagnostic_capacity),
            max_depth: config.max_depth,
            events: None,
            reported_missing: BTreeSet::new(),
        }
    }

    /// Build a graph with the configured limits, bootstrap badges and relations.
    pub fn from_config(config: &GraphConfig) -> Result<Self, BadgeError> {
        config.validate()?;
        let mut graph = BadgeGraph {
            diagnostics: DiagnosticLog::new(config.diagnostic_capacity),
            max_depth: config.max_depth,
            ..BadgeGraph::new()
        };
        for badge in config.badges.iter() {
            // Duplicates are already recorded as diagnostics.
            let _ = graph.register_with(
                BadgeSpec::new(&badge.key)
                    .kind(badge.kind)
                    .groups(badge.groups.iter().cloned())
                    .parents(badge.parents.iter().cloned()),
            );
        }
        for (child, parents) in config.relations.iter() {
            graph.add_edges(child, parents);
        }
        for (parent, children) in config.reverse_relations.iter() {
            graph.add_reverse_edges(parent, children);
        }
        tracing::debug!(
            "[BadgeGraph::from_config] {} badges, {} relations",
            graph.nodes.len(),
            graph.edges.edge_count()
        );
        Ok(graph)
    }

    /// Stream registrations, value changes and diagnostics to `tx`.
    pub fn with_events(mut self, tx: Sender<BadgeEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    // ---------------------------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------------------------

    pub fn register(
        &mut self,
        key: impl Into<String>,
        checker: Option<Checker>,
    ) -> Result<(), BadgeError> {
        let mut spec = BadgeSpec::new(key);
        spec.checker = checker;
        self.register_with(spec)
    }

    pub fn register_with(&mut self, spec: BadgeSpec) -> Result<(), BadgeError> {
        let BadgeSpec {
            key,
            checker,
            kind,
            groups,
            parents,
        } = spec;
        if let Err(e) = self.nodes.insert(&key, checker, kind, &groups) {
            self.record(Diagnostic::DuplicateRegistration(key));
            return Err(e);
        }
        self.edges.add_edges(&key, &parents);
        self.reported_missing.retain(|(_, parent)| *parent != key);
        tracing::debug!("[BadgeGraph::register] {key} ({kind})");
        self.emit(BadgeEvent::Registered(key));
        Ok(())
    }

    /// Remove a badge, its observers, its outgoing relations and its group memberships.
    ///
    /// With `refresh_first`, the badge is first driven to zero so that its observers and its
    /// ancestors see the loss. Relations other badges hold into `key` are left in place.
    pub fn unregister(&mut self, key: &str, refresh_first: bool) -> Option<RefreshOutcome> {
        let (outcome, pending) = self.unregister_deferred(key, refresh_first);
        self.dispatch(pending);
        outcome
    }

    pub(crate) fn unregister_deferred(
        &mut self,
        key: &str,
        refresh_first: bool,
    ) -> (Option<RefreshOutcome>, PendingNotifications) {
        let mut result = (None, PendingNotifications::default());
        if self.nodes.contains(key) {
            if refresh_first {
                self.nodes.replace_checker(key, Some(Checker::zero()));
                let (outcome, pending) = self.refresh_deferred(key);
                result = (Some(outcome), pending);
            }
            self.nodes.remove(key);
            self.edges.remove_child(key);
            self.reported_missing.retain(|(child, _)| child != key);
            tracing::debug!("[BadgeGraph::unregister] {key}");
            self.emit(BadgeEvent::Unregistered(key.to_string()));
        }
        // Bindings made before the key was ever registered go too.
        self.observers.remove_key(key);
        result
    }

    pub fn add_edge(&mut self, child: &str, parent: &str) {
        self.edges.add_edge(child, parent);
    }

    pub fn add_edges<I, S>(&mut self, child: &str, parents: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.edges.add_edges(child, parents);
    }

    pub fn add_reverse_edges<I, S>(&mut self, parent: &str, children: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.edges.add_reverse_edges(parent, children);
    }

    /// Drop every relation leaving `child`. Values already propagated are kept.
    pub fn remove_child(&mut self, child: &str) -> Vec<String> {
        self.reported_missing.retain(|(from, _)| from != child);
        self.edges
            .remove_child(child)
            .map(|parents| parents.into_iter().collect())
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------------------

    /// Stored value, 0 for unknown keys. Never runs a checker.
    pub fn get_value(&self, key: &str) -> u64 {
        self.nodes.value(key)
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.get_value(key) > 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains(key)
    }

    pub fn node(&self, key: &str) -> Option<&BadgeNode> {
        self.nodes.get(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn group_keys(&self, group: &str) -> Vec<String> {
        self.nodes.group_keys(group)
    }

    pub fn parents_of(&self, key: &str) -> Vec<String> {
        self.edges.parents_of(key)
    }

    pub fn children_of(&self, key: &str) -> Vec<String> {
        self.edges.children_of(key)
    }

    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    // ---------------------------------------------------------------------------------------
    // Refresh and propagation
    // ---------------------------------------------------------------------------------------

    /// Re-run `key`'s checker and carry any change to its ancestors.
    ///
    /// Unknown keys, static badges, unchanged values and failing checkers all leave the graph
    /// untouched and notify nobody.
    pub fn refresh(&mut self, key: &str) -> RefreshOutcome {
        let (outcome, pending) = self.refresh_deferred(key);
        self.dispatch(pending);
        outcome
    }

    pub(crate) fn refresh_deferred(&mut self, key: &str) -> (RefreshOutcome, PendingNotifications) {
        let outcome = match self.evaluate(key) {
            Some(value) => self.apply(key, value),
            None => RefreshOutcome::unchanged(key),
        };
        let pending = self.pending_for(&outcome);
        (outcome, pending)
    }

    /// Refresh each distinct key once, in first-seen order. Every refresh settles on its own.
    pub fn refresh_many<I, S>(&mut self, keys: I) -> Vec<RefreshOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        dedup_keys(keys)
            .iter()
            .map(|key| self.refresh(key))
            .collect()
    }

    pub fn refresh_group(&mut self, group: &str) -> Vec<RefreshOutcome> {
        let keys = self.nodes.group_keys(group);
        self.refresh_many(keys)
    }

    /// Push a value into a static badge and propagate the change.
    pub fn set_value(&mut self, key: &str, count: u64) -> Result<RefreshOutcome, BadgeError> {
        let (outcome, pending) = self.set_value_deferred(key, count)?;
        self.dispatch(pending);
        Ok(outcome)
    }

    pub(crate) fn set_value_deferred(
        &mut self,
        key: &str,
        count: u64,
    ) -> Result<(RefreshOutcome, PendingNotifications), BadgeError> {
        let node = self
            .nodes
            .get(key)
            .ok_or_else(|| BadgeError::NotFound(key.to_string()))?;
        if !node.is_static() {
            return Err(BadgeError::HasChecker(key.to_string()));
        }
        let value = node.kind.normalize(count);
        let outcome = self.apply(key, value);
        let pending = self.pending_for(&outcome);
        Ok((outcome, pending))
    }

    /// Zero every value without notifying anyone.
    pub fn reset(&mut self) {
        self.nodes.reset_values();
    }

    /// Forget every badge, relation, group and observer. Retained diagnostics are kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.observers.clear();
        self.reported_missing.clear();
    }

    fn evaluate(&mut self, key: &str) -> Option<u64> {
        let node = self.nodes.get(key)?;
        let kind = node.kind;
        let checker = node.checker.clone()?;
        match checker.check() {
            Ok(value) => Some(kind.normalize(value)),
            Err(e) => {
                self.record(Diagnostic::CheckerFailed {
                    key: key.to_string(),
                    message: e.to_string(),
                });
                None
            }
        }
    }

    fn apply(&mut self, key: &str, value: u64) -> RefreshOutcome {
        let Some(node) = self.nodes.get_mut(key) else {
            return RefreshOutcome::unchanged(key);
        };
        let old = node.value;
        if old == value {
            return RefreshOutcome::unchanged(key);
        }
        node.value = value;

        let delta = signed_delta(old, value);
        tracing::debug!("[BadgeGraph::refresh] {key}: {old} -> {value} (delta {delta})");
        self.emit(BadgeEvent::ValueChanged {
            key: key.to_string(),
            old,
            new: value,
        });

        let mut outcome = RefreshOutcome {
            key: key.to_string(),
            delta,
            changed: vec![(key.to_string(), value)],
        };
        self.propagate(key, delta, &mut outcome);
        outcome
    }

    fn propagate(&mut self, origin: &str, delta: i64, outcome: &mut RefreshOutcome) {
        let mut visited = BTreeSet::from([origin.to_string()]);
        let mut path = vec![Frame {
            key: origin.to_string(),
            parents: self.edges.parents_of(origin),
            next: 0,
        }];

        loop {
            let Some(frame) = path.last_mut() else {
                break;
            };
            let Some(parent) = frame.parents.get(frame.next).cloned() else {
                path.pop();
                continue;
            };
            frame.next += 1;
            let child = frame.key.clone();

            if visited.contains(&parent) {
                // Reconverging paths (a diamond) are expected; reaching our own ancestry is not.
                if path.iter().any(|frame| frame.key == parent) {
                    let mut cycle: Vec<String> = path.iter().map(|f| f.key.clone()).collect();
                    cycle.push(parent.clone());
                    self.record(Diagnostic::Cycle {
                        key: parent,
                        path: cycle,
                    });
                }
                continue;
            }

            if path.len() > self.max_depth {
                self.record(Diagnostic::DepthExceeded {
                    key: parent,
                    max_depth: self.max_depth,
                });
                continue;
            }

            let Some(node) = self.nodes.get_mut(&parent) else {
                if self
                    .reported_missing
                    .insert((child.clone(), parent.clone()))
                {
                    self.record(Diagnostic::MissingParent { child, parent });
                } else {
                    tracing::debug!("[BadgeGraph::refresh] skipping unregistered {parent}");
                }
                continue;
            };
            let old = node.value;
            let new = apply_delta(old, delta);
            node.value = new;

            visited.insert(parent.clone());
            outcome.changed.push((parent.clone(), new));
            if old != new {
                self.emit(BadgeEvent::ValueChanged {
                    key: parent.clone(),
                    old,
                    new,
                });
            }
            path.push(Frame {
                parents: self.edges.parents_of(&parent),
                key: parent,
                next: 0,
            });
        }
    }

    fn pending_for(&self, outcome: &RefreshOutcome) -> PendingNotifications {
        let mut pending = PendingNotifications::default();
        for (key, value) in outcome.changed.iter() {
            pending.push(key, *value, self.observers.snapshot(key));
        }
        pending
    }

    // ---------------------------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------------------------

    /// Bind `observer` to `key`. With `invoke_now` it is called once with the stored value,
    /// which is 0 for a badge that is unknown or has never been refreshed.
    pub fn bind(&mut self, key: &str, observer: Observer, invoke_now: bool) {
        let pending = self.bind_deferred(key, observer, invoke_now);
        self.dispatch(pending);
    }

    pub(crate) fn bind_deferred(
        &mut self,
        key: &str,
        observer: Observer,
        invoke_now: bool,
    ) -> PendingNotifications {
        let mut pending = PendingNotifications::default();
        if invoke_now {
            pending.push(key, self.get_value(key), vec![observer.clone()]);
        }
        if !self.observers.bind(key, observer) {
            tracing::debug!("[BadgeGraph::bind] observer already bound to {key}");
        }
        pending
    }

    pub fn unbind(&mut self, key: &str, observer: &Observer) -> bool {
        self.observers.unbind(key, observer)
    }

    pub fn observer_count(&self, key: &str) -> usize {
        self.observers.count(key)
    }

    fn dispatch(&mut self, pending: PendingNotifications) {
        for failure in pending.dispatch() {
            self.record(failure);
        }
    }

    // ---------------------------------------------------------------------------------------
    // Diagnostics
    // ---------------------------------------------------------------------------------------

    pub fn has_cycle(&self) -> bool {
        CycleDetector::new(&self.edges).has_cycle()
    }

    pub fn cycles(&self) -> Vec<Vec<String>> {
        CycleDetector::new(&self.edges).cycles()
    }

    /// Cycles and relations touching unregistered badges. Does not record anything.
    pub fn validate(&self) -> Vec<Diagnostic> {
        CycleDetector::new(&self.edges).validate(&self.nodes)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.emit(BadgeEvent::Diagnostic(diagnostic.clone()));
        self.diagnostics.push(diagnostic);
    }

    fn emit(&mut self, event: BadgeEvent) {
        if let Some(tx) = self.events.as_ref() {
            if let Err(e) = tx.send(event) {
                tracing::debug!("[BadgeGraph] event receiver dropped, no longer emitting: {e}");
                self.events = None;
            }
        }
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeSnapshot {
                    key: node.key.clone(),
                    value: node.value,
                    kind: node.kind,
                    has_checker: !node.is_static(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|(child, parent)| EdgeSnapshot {
                    child: child.to_string(),
                    parent: parent.to_string(),
                    dangling: !self.nodes.contains(parent),
                })
                .collect(),
            observers: self.observers.counts(),
            groups: self
                .nodes
                .groups()
                .iter()
                .map(|(group, keys)| (group.clone(), keys.iter().cloned().collect()))
                .collect(),
            has_cycle: self.has_cycle(),
        }
    }

    /// Human readable relations, values and observer counts.
    pub fn dump_graph(&self) -> String {
        self.snapshot().to_string()
    }

    pub fn kind_of(&self, key: &str) -> Option<BadgeKind> {
        self.nodes.get(key).map(BadgeNode::kind)
    }
}

pub(crate) fn dedup_keys<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    keys.into_iter()
        .filter(|key| seen.insert(key.as_ref().to_string()))
        .map(|key| key.as_ref().to_string())
        .collect()
}

fn signed_delta(old: u64, new: u64) -> i64 {
    let delta = i128::from(new) - i128::from(old);
    delta.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// `max(0, value + delta)` without overflow.
fn apply_delta(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}
