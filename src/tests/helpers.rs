//! Shared test utilities for BadgeGraph testing

use crate::{BadgeGraph, Checker, Observer};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

/// A settable data source standing in for "unread mail" style queries.
#[derive(Clone, Default)]
pub struct Source(Arc<AtomicI64>);

impl Source {
    pub fn new(value: i64) -> Self {
        Source(Arc::new(AtomicI64::new(value)))
    }

    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::SeqCst);
    }

    pub fn checker(&self) -> Checker {
        let inner = self.0.clone();
        Checker::new(move || inner.load(Ordering::SeqCst))
    }
}

/// Observer that remembers every notification it receives.
#[derive(Clone)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(String, u64)>>>,
    observer: Observer,
}

impl Default for Recorder {
    fn default() -> Self {
        let calls: Arc<Mutex<Vec<(String, u64)>>> = Arc::default();
        let sink = calls.clone();
        let observer = Observer::new(move |key, value| sink.lock().push((key.to_string(), value)));
        Recorder { calls, observer }
    }
}

impl Recorder {
    pub fn observer(&self) -> Observer {
        self.observer.clone()
    }

    pub fn calls(&self) -> Vec<(String, u64)> {
        self.calls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last(&self) -> Option<(String, u64)> {
        self.calls.lock().last().cloned()
    }
}

/// `a -> b`, `a -> c`, `b -> d`, `c -> d`, with `a` driven by the returned source.
pub fn diamond() -> (BadgeGraph, Source) {
    let source = Source::new(0);
    let mut graph = BadgeGraph::new();
    graph.register("a", Some(source.checker())).unwrap();
    for key in ["b", "c", "d"] {
        graph.register(key, None).unwrap();
    }
    graph.add_edges("a", ["b", "c"]);
    graph.add_edge("b", "d");
    graph.add_edge("c", "d");
    (graph, source)
}
