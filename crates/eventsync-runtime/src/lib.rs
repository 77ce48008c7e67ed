#![forbid(unsafe_code)]

//! Runtime: the live store, change fan-out, and path bindings.
//!
//! # Role in eventsync
//! `eventsync-runtime` owns shared state at run time. It holds the tree,
//! broadcasts every real change, and lets UI components subscribe to the
//! slices they render.
//!
//! # Primary responsibilities
//! - **Store**: single write path over a path-addressed tree, with no-op
//!   suppression by identity.
//! - **ChangeNotifier**: ordered, snapshot-based broadcast of
//!   [`ChangeRecord`]s.
//! - **Bindings**: [`use_bound_state`] filters records by root key, diffs
//!   the bound paths, and triggers one re-render per effective change.
//! - **Host capabilities**: [`Hooks`] and [`LocalState`], the two things a
//!   UI framework must supply to host a binding.
//!
//! # Threading
//! Everything here is single-threaded (`Rc`/`RefCell`). `set`, the
//! broadcast it causes and every handler finish before `set` returns.

pub mod binding;
pub mod host;
pub mod notifier;
pub mod store;

pub use binding::{BoundSetters, BoundValues, PathRequest, Setter, bind_paths, use_bound_state};
pub use host::{Cleanup, Effect, Hooks, LocalState, cleanup};
pub use notifier::{ChangeNotifier, ChangeRecord, HandlerId, Subscription};
pub use store::{Store, StoreConfig, WeakStore};

pub use eventsync_core::{StoreError, Value};
