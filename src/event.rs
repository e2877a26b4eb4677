use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::diagnostic::Diagnostic;

/// Changes emitted by a [`crate::BadgeGraph`] built with [`crate::BadgeGraph::with_events`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeEvent {
    Registered(String),
    Unregistered(String),
    /// Key, previous value, new value
    ValueChanged { key: String, old: u64, new: u64 },
    Diagnostic(Diagnostic),
}

impl BadgeEvent {
    pub fn key(&self) -> &str {
        match self {
            BadgeEvent::Registered(key) => key,
            BadgeEvent::Unregistered(key) => key,
            BadgeEvent::ValueChanged { key, .. } => key,
            BadgeEvent::Diagnostic(diagnostic) => diagnostic.key(),
        }
    }
}

impl Display for BadgeEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            BadgeEvent::Registered(_) => write!(f, "Registered"),
            BadgeEvent::Unregistered(_) => write!(f, "Unregistered"),
            BadgeEvent::ValueChanged { .. } => write!(f, "ValueChanged"),
            BadgeEvent::Diagnostic(_) => write!(f, "Diagnostic"),
        }
    }
}
