//! Per-key observer lists and notification dispatch.
//!
//! Observers are identified by their allocation: cloning an [`Observer`] yields the same
//! observer, constructing a new one from an identical closure does not. Keep the handle you
//! bound if you intend to unbind it later.
//!
//! Dispatch always runs over a snapshot taken before any observer is called, and each call is
//! isolated with `catch_unwind`, so a panicking observer cannot starve the ones after it.

use std::{
    collections::BTreeMap,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use crate::{checker::panic_message, diagnostic::Diagnostic};

pub type ObserverFn = dyn Fn(&str, u64) + Send + Sync;

#[derive(Clone)]
pub struct Observer(Arc<ObserverFn>);

impl Observer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, u64) + Send + Sync + 'static,
    {
        Observer(Arc::new(f))
    }

    /// Observe only whether the badge has anything to show.
    pub fn presence<F>(f: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        Observer::new(move |_, count| f(count > 0))
    }

    /// Observe the badge count, ignoring the key.
    pub fn count<F>(f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        Observer::new(move |_, count| f(count))
    }

    /// True when both handles refer to the same bound callback.
    pub fn same(&self, other: &Observer) -> bool {
        Arc::as_ptr(&self.0).cast::<()>() == Arc::as_ptr(&other.0).cast::<()>()
    }

    pub(crate) fn notify(&self, key: &str, value: u64) -> Result<(), String> {
        catch_unwind(AssertUnwindSafe(|| (self.0)(key, value)))
            .map_err(|payload| panic_message(payload.as_ref()))
    }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Observer {}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observer")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObserverRegistry {
    observers: BTreeMap<String, Vec<Observer>>,
}

impl ObserverRegistry {
    /// Returns false if the observer was already bound to `key`.
    pub fn bind(&mut self, key: &str, observer: Observer) -> bool {
        let bound = self.observers.entry(key.to_string()).or_default();
        if bound.iter().any(|existing| existing.same(&observer)) {
            return false;
        }
        bound.push(observer);
        true
    }

    /// Returns false if the observer was not bound to `key`.
    pub fn unbind(&mut self, key: &str, observer: &Observer) -> bool {
        let Some(bound) = self.observers.get_mut(key) else {
            return false;
        };
        let before = bound.len();
        bound.retain(|existing| !existing.same(observer));
        let removed = bound.len() != before;
        if bound.is_empty() {
            self.observers.remove(key);
        }
        removed
    }

    pub fn snapshot(&self, key: &str) -> Vec<Observer> {
        self.observers.get(key).cloned().unwrap_or_default()
    }

    pub fn count(&self, key: &str) -> usize {
        self.observers.get(key).map(Vec::len).unwrap_or(0)
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.observers
            .iter()
            .map(|(key, bound)| (key.clone(), bound.len()))
            .collect()
    }

    pub fn remove_key(&mut self, key: &str) -> Vec<Observer> {
        self.observers.remove(key).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

/// Notifications gathered during one propagation pass, ready to be delivered once the graph
/// is no longer borrowed.
#[derive(Debug, Default)]
pub struct PendingNotifications {
    entries: Vec<(String, u64, Vec<Observer>)>,
}

impl PendingNotifications {
    pub fn push(&mut self, key: &str, value: u64, observers: Vec<Observer>) {
        if !observers.is_empty() {
            self.entries.push((key.to_string(), value, observers));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extend(&mut self, other: PendingNotifications) {
        self.entries.extend(other.entries);
    }

    /// Deliver every notification in order. Failures are returned rather than raised.
    #[must_use]
    pub fn dispatch(self) -> Vec<Diagnostic> {
        let mut failures = Vec::new();
        for (key, value, observers) in self.entries {
            for observer in observers {
                if let Err(message) = observer.notify(&key, value) {
                    failures.push(Diagnostic::ObserverFailed {
                        key: key.clone(),
                        message,
                    });
                }
            }
        }
        failures
    }
}
