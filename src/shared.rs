//! Thread-safe handle over a [`BadgeGraph`].
//!
//! Every mutation takes the write lock, so refreshes queue behind one another and a
//! propagation walk is never entered twice at once. Observers are called *after* the lock is
//! released, which lets them read, bind, unbind or even refresh through the same handle.
//! Checkers run under the lock and must not call back into the handle that owns them.
//!
//! Notification batches enter a FIFO queue before the write lock is dropped, and only one
//! caller drains it at a time. A refresh issued from inside an observer, or from another
//! thread while a drain is running, is delivered after the batches ahead of it, so the last
//! value an observer sees is the stored one. The consequence is that such a call may return
//! before its own observers have run.

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::{collections::VecDeque, sync::Arc};

use crate::{
    checker::Checker,
    config::GraphConfig,
    diagnostic::Diagnostic,
    graph::{dedup_keys, BadgeGraph, RefreshOutcome},
    node::BadgeSpec,
    observer::{Observer, PendingNotifications},
    snapshot::GraphSnapshot,
    BadgeError,
};

/// Lazily constructed process-wide graph for call sites without a composition root.
pub static GLOBAL: Lazy<SharedBadgeGraph> = Lazy::new(SharedBadgeGraph::default);

pub fn global() -> &'static SharedBadgeGraph {
    &GLOBAL
}

#[derive(Debug, Default)]
struct DeliveryQueue {
    batches: VecDeque<PendingNotifications>,
    draining: bool,
}

#[derive(Debug, Default)]
struct Inner {
    graph: RwLock<BadgeGraph>,
    delivery: Mutex<DeliveryQueue>,
}

#[derive(Debug, Clone, Default)]
pub struct SharedBadgeGraph(Arc<Inner>);

impl From<BadgeGraph> for SharedBadgeGraph {
    fn from(graph: BadgeGraph) -> Self {
        SharedBadgeGraph(Arc::new(Inner {
            graph: RwLock::new(graph),
            delivery: Mutex::default(),
        }))
    }
}

impl SharedBadgeGraph {
    pub fn new() -> Self {
        SharedBadgeGraph::default()
    }

    pub fn from_config(config: &GraphConfig) -> Result<Self, BadgeError> {
        Ok(BadgeGraph::from_config(config)?.into())
    }

    /// Read access to the whole graph. Do not hold it across calls that mutate this handle.
    pub fn read(&self) -> RwLockReadGuard<'_, BadgeGraph> {
        self.0.graph.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, BadgeGraph> {
        self.0.graph.write()
    }

    pub fn register(
        &self,
        key: impl Into<String>,
        checker: Option<Checker>,
    ) -> Result<(), BadgeError> {
        self.write().register(key, checker)
    }

    pub fn register_with(&self, spec: BadgeSpec) -> Result<(), BadgeError> {
        self.write().register_with(spec)
    }

    pub fn unregister(&self, key: &str, refresh_first: bool) -> Option<RefreshOutcome> {
        let outcome = {
            let mut graph = self.write();
            let (outcome, pending) = graph.unregister_deferred(key, refresh_first);
            self.enqueue(pending);
            outcome
        };
        self.drain();
        outcome
    }

    pub fn add_edge(&self, child: &str, parent: &str) {
        self.write().add_edge(child, parent);
    }

    pub fn add_edges<I, S>(&self, child: &str, parents: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write().add_edges(child, parents);
    }

    pub fn add_reverse_edges<I, S>(&self, parent: &str, children: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write().add_reverse_edges(parent, children);
    }

    pub fn remove_child(&self, child: &str) -> Vec<String> {
        self.write().remove_child(child)
    }

    pub fn get_value(&self, key: &str) -> u64 {
        self.read().get_value(key)
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.read().has_value(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains(key)
    }

    pub fn refresh(&self, key: &str) -> RefreshOutcome {
        let outcome = {
            let mut graph = self.write();
            let (outcome, pending) = graph.refresh_deferred(key);
            self.enqueue(pending);
            outcome
        };
        self.drain();
        outcome
    }

    pub fn refresh_many<I, S>(&self, keys: I) -> Vec<RefreshOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        dedup_keys(keys)
            .iter()
            .map(|key| self.refresh(key))
            .collect()
    }

    pub fn refresh_group(&self, group: &str) -> Vec<RefreshOutcome> {
        let keys = self.read().group_keys(group);
        self.refresh_many(keys)
    }

    pub fn set_value(&self, key: &str, count: u64) -> Result<RefreshOutcome, BadgeError> {
        let outcome = {
            let mut graph = self.write();
            let (outcome, pending) = graph.set_value_deferred(key, count)?;
            self.enqueue(pending);
            outcome
        };
        self.drain();
        Ok(outcome)
    }

    pub fn bind(&self, key: &str, observer: Observer, invoke_now: bool) {
        {
            let mut graph = self.write();
            let pending = graph.bind_deferred(key, observer, invoke_now);
            self.enqueue(pending);
        }
        self.drain();
    }

    pub fn unbind(&self, key: &str, observer: &Observer) -> bool {
        self.write().unbind(key, observer)
    }

    pub fn reset(&self) {
        self.write().reset();
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn has_cycle(&self) -> bool {
        self.read().has_cycle()
    }

    pub fn cycles(&self) -> Vec<Vec<String>> {
        self.read().cycles()
    }

    pub fn validate(&self) -> Vec<Diagnostic> {
        self.read().validate()
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.write().take_diagnostics()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.read().snapshot()
    }

    pub fn dump_graph(&self) -> String {
        self.read().dump_graph()
    }

    /// Must be called with the write lock held so queue order follows mutation order.
    fn enqueue(&self, pending: PendingNotifications) {
        if !pending.is_empty() {
            self.0.delivery.lock().batches.push_back(pending);
        }
    }

    /// Deliver queued batches in order unless another caller is already doing so.
    fn drain(&self) {
        {
            let mut delivery = self.0.delivery.lock();
            if delivery.draining || delivery.batches.is_empty() {
                return;
            }
            delivery.draining = true;
        }
        loop {
            let next = {
                let mut delivery = self.0.delivery.lock();
                let next = delivery.batches.pop_front();
                if next.is_none() {
                    delivery.draining = false;
                }
                next
            };
            let Some(pending) = next else {
                break;
            };
            let failures = pending.dispatch();
            if !failures.is_empty() {
                let mut graph = self.write();
                for failure in failures {
                    graph.record(failure);
                }
            }
        }
    }
}
