//! # badge-graph
//!
//! Incrementally maintained notification badges ("red dots") arranged in a directed graph.
//!
//! ## Overview
//!
//! Each badge is a named, non-negative counter. A leaf badge gets its value from a
//! caller-supplied [`Checker`]; a parent badge accumulates the *changes* of every badge that
//! points at it. Refreshing one leaf recomputes only that leaf, then pushes the signed delta up
//! the graph, so only the badges that actually changed are touched and only their observers are
//! woken. A UI can read any badge at any time without running a checker.
//!
//! ### Key Features
//!
//! - **Lazy leaves**: checkers run only when a refresh is requested
//! - **Delta propagation**: ancestors are updated by addition, never rescanned
//! - **No-op on unchanged values**: an unchanged leaf notifies nobody
//! - **Cycle tolerant**: every badge is updated at most once per refresh, cycles are reported as
//!   diagnostics rather than looping, and walks are depth bounded
//! - **Isolated collaborators**: failing checkers and panicking observers are contained and
//!   logged
//!
//! ## Architecture
//!
//! - **[`node`]**: the badge arena (`NodeStore`), badge kinds and groups
//! - **[`edges`]**: the `child -> parents` relation (`EdgeStore`)
//! - **[`observer`]**: per-badge observer lists and snapshot dispatch
//! - **[`graph`]**: the propagation engine, [`BadgeGraph`]
//! - **[`cycle`]**: whole-graph cycle detection and validation
//! - **[`shared`]**: [`SharedBadgeGraph`], a thread-safe handle, and a lazy [`global`] instance
//! - **[`config`]**: TOML configuration for limits and bootstrap topology
//!
//! ## Quick Start
//!
//! ```rust
//! use badge_graph::{BadgeGraph, Checker, Observer};
//! use std::sync::{
//!     atomic::{AtomicI64, Ordering},
//!     Arc,
//! };
//!
//! let unread = Arc::new(AtomicI64::new(2));
//! let source = unread.clone();
//!
//! let mut graph = BadgeGraph::new();
//! graph.register("main_menu", None).unwrap();
//! graph
//!     .register("mail", Some(Checker::new(move || source.load(Ordering::SeqCst))))
//!     .unwrap();
//! graph.add_edge("mail", "main_menu");
//!
//! graph.bind("main_menu", Observer::presence(|visible| println!("dot: {visible}")), true);
//!
//! graph.refresh("mail");
//! assert_eq!(graph.get_value("main_menu"), 2);
//!
//! unread.store(5, Ordering::SeqCst);
//! graph.refresh("mail");
//! assert_eq!(graph.get_value("main_menu"), 5);
//! ```
//!
//! ## Features
//!
//! - **default**: the engine
//! - **bin**: the `badge` diagnostics CLI

pub mod checker;
pub mod config;
pub mod cycle;
pub mod diagnostic;
pub mod edges;
pub mod error;
pub mod event;
pub mod graph;
pub mod node;
pub mod observer;
pub mod shared;
pub mod snapshot;
#[cfg(test)]
mod tests;

pub use checker::Checker;
pub use config::GraphConfig;
pub use diagnostic::Diagnostic;
pub use error::*;
pub use event::BadgeEvent;
pub use graph::{BadgeGraph, RefreshOutcome};
pub use node::{BadgeKind, BadgeSpec};
pub use observer::Observer;
pub use shared::{global, SharedBadgeGraph};
