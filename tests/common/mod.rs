//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use badge_graph::Checker;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times, subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A checker backed by a shared counter the test can move around.
#[allow(dead_code)]
pub fn counter(initial: i64) -> (Arc<AtomicI64>, Checker) {
    let value = Arc::new(AtomicI64::new(initial));
    let source = value.clone();
    (value, Checker::new(move || source.load(Ordering::SeqCst)))
}

#[allow(dead_code)]
pub const MENU_CONFIG: &str = r#"
max_depth = 16
diagnostic_capacity = 32

[relations]
mail = ["main_menu"]
tasks = ["main_menu"]
main_menu = ["hud"]

[[badges]]
key = "hud"

[[badges]]
key = "main_menu"
groups = ["menus"]

[[badges]]
key = "mail"
groups = ["inbox"]

[[badges]]
key = "tasks"
kind = "state"
groups = ["inbox"]
"#;
