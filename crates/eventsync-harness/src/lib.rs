#![forbid(unsafe_code)]

//! Test harness for eventsync bindings.
//!
//! # Role in eventsync
//! Bindings are written against the [`Hooks`](eventsync_runtime::Hooks)
//! capability trait, not a UI framework. This crate supplies a headless
//! implementation of that trait so bindings can be mounted, re-rendered
//! and torn down deterministically, with render and trigger counts
//! available for assertions.

pub mod fixtures;
pub mod headless;

pub use fixtures::{record_changes, seeded_store};
pub use headless::{HeadlessHost, HookCx, MAX_FLUSH_RENDERS};
