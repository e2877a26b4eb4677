//! Non-fatal anomalies noticed while building or propagating the graph.
//!
//! Nothing in the engine aborts on bad configuration or misbehaving collaborators. Instead the
//! anomaly is logged through `tracing` and retained in a bounded [`DiagnosticLog`] so hosts and
//! tests can inspect it after the fact.

use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    fmt::{Display, Formatter},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A key was registered while already present.
    DuplicateRegistration(String),
    /// An edge points at a parent that is not registered.
    MissingParent { child: String, parent: String },
    /// An edge leaves a child that is not registered.
    MissingChild { child: String, parent: String },
    /// Propagation reached `key` again along its own descent path.
    Cycle { key: String, path: Vec<String> },
    /// Propagation stopped before `key` because the walk exceeded `max_depth`.
    DepthExceeded { key: String, max_depth: usize },
    CheckerFailed { key: String, message: String },
    ObserverFailed { key: String, message: String },
}

impl Diagnostic {
    pub fn key(&self) -> &str {
        match self {
            Diagnostic::DuplicateRegistration(key) => key,
            Diagnostic::MissingParent { parent, .. } => parent,
            Diagnostic::MissingChild { child, .. } => child,
            Diagnostic::Cycle { key, .. } => key,
            Diagnostic::DepthExceeded { key, .. } => key,
            Diagnostic::CheckerFailed { key, .. } => key,
            Diagnostic::ObserverFailed { key, .. } => key,
        }
    }

    /// Cycles, exhausted depth and failing collaborators are errors; the rest are smells.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Diagnostic::DuplicateRegistration(_)
                | Diagnostic::MissingParent { .. }
                | Diagnostic::MissingChild { .. }
        )
    }

    pub fn log(&self) {
        if self.is_error() {
            tracing::error!("[BadgeGraph] {self}");
        } else {
            tracing::warn!("[BadgeGraph] {self}");
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Diagnostic::DuplicateRegistration(key) => {
                write!(f, "register of existing key '{key}' ignored")
            }
            Diagnostic::MissingParent { child, parent } => {
                write!(f, "relation {child} -> {parent} targets an unregistered badge")
            }
            Diagnostic::MissingChild { child, parent } => {
                write!(f, "relation {child} -> {parent} leaves an unregistered badge")
            }
            Diagnostic::Cycle { key, path } => {
                write!(f, "config error, cycle in relations at '{key}': {}", path.join(" -> "))
            }
            Diagnostic::DepthExceeded { key, max_depth } => write!(
                f,
                "propagation to '{key}' skipped, walk deeper than max_depth {max_depth}"
            ),
            Diagnostic::CheckerFailed { key, message } => {
                write!(f, "checker for '{key}' failed, value left unchanged: {message}")
            }
            Diagnostic::ObserverFailed { key, message } => {
                write!(f, "observer of '{key}' failed: {message}")
            }
        }
    }
}

/// Ring of the most recent diagnostics.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    capacity: usize,
    entries: VecDeque<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        DiagnosticLog {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
