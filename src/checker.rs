//! Checkers produce a badge's authoritative leaf value on demand.
//!
//! A checker is an opaque, caller-supplied function. The engine never trusts it: negative
//! results are clamped to zero, and both `Err` returns and panics are contained so that a
//! faulty data source can only leave its own badge stale.

use std::{
    any::Any,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use crate::BadgeError;

pub type CheckFn = dyn Fn() -> Result<i64, BadgeError> + Send + Sync;

/// Cloneable handle over a checker function.
#[derive(Clone)]
pub struct Checker(Arc<CheckFn>);

impl Checker {
    /// Wrap an infallible counting function.
    ///
    /// ```
    /// # use badge_graph::checker::Checker;
    /// let unread = Checker::new(|| 3);
    /// assert_eq!(unread.check(), Ok(3));
    /// ```
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        Checker(Arc::new(move || Ok(f())))
    }

    /// Wrap a counting function that can report that it has no answer right now.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn() -> Result<i64, BadgeError> + Send + Sync + 'static,
    {
        Checker(Arc::new(f))
    }

    pub fn constant(value: i64) -> Self {
        Checker::new(move || value)
    }

    pub(crate) fn zero() -> Self {
        Checker::constant(0)
    }

    /// Run the checker. The result is never negative.
    pub fn check(&self) -> Result<u64, BadgeError> {
        match catch_unwind(AssertUnwindSafe(|| (self.0)())) {
            Ok(Ok(raw)) => Ok(raw.max(0) as u64),
            Ok(Err(BadgeError::Checker(msg))) => Err(BadgeError::Checker(msg)),
            Ok(Err(other)) => Err(BadgeError::Checker(other.to_string())),
            Err(payload) => Err(BadgeError::Checker(format!(
                "checker panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Checker")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn negative_results_clamp_to_zero() {
        assert_eq!(Checker::constant(-4).check(), Ok(0));
    }

    #[test]
    fn errors_are_reported_as_checker_failures() {
        let failing = Checker::fallible(|| Err(BadgeError::NotFound("inbox".to_string())));
        match failing.check() {
            Err(BadgeError::Checker(msg)) => assert!(msg.contains("inbox")),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn panics_are_contained() {
        let panicking = Checker::new(|| panic!("data source offline"));
        match panicking.check() {
            Err(BadgeError::Checker(msg)) => assert!(msg.contains("data source offline")),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
