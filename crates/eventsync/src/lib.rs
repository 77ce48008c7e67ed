#![forbid(unsafe_code)]

//! Path-addressed shared state with per-component change subscriptions.
//!
//! # Role in eventsync
//! `eventsync` is the application-facing entry point. It re-exports the
//! [`Store`], [`Value`] and binding types, and keeps one default store per
//! thread so an application can use free functions instead of threading a
//! store handle through every component.
//!
//! ```
//! use eventsync::prelude::*;
//!
//! init_state(Value::from(serde_json::json!({"user": {"name": "Alice"}}))).unwrap();
//! assert!(set_state("user.name", "Bob"));
//! assert_eq!(get_state("user.name"), Some(Value::from("Bob")));
//! ```
//!
//! # How it fits in the system
//! - `eventsync-core`: the [`Value`] tree and dot-path read/write.
//! - `eventsync-runtime`: [`Store`], the change notifier, and bindings over
//!   the [`Hooks`] capability trait.
//! - `eventsync-harness`: a headless [`Hooks`] implementation for tests.
//!
//! The default store is thread-local: initialization happens once per
//! thread, and state is never shared across threads.

#[cfg(feature = "tracing-json")]
pub mod logging;

pub use eventsync_core::{Map, StoreError, Value, path};
pub use eventsync_runtime::{
    BoundSetters, BoundValues, ChangeNotifier, ChangeRecord, Cleanup, Effect, HandlerId, Hooks,
    LocalState, PathRequest, Setter, Store, StoreConfig, Subscription, WeakStore, bind_paths,
    cleanup,
};

use tracing::debug;

/// Standard result type for eventsync APIs.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

thread_local! {
    static DEFAULT_STORE: Store = {
        debug!("default store created");
        Store::new()
    };
}

/// Handle to this thread's default store.
#[must_use]
pub fn default_store() -> Store {
    DEFAULT_STORE.with(Store::clone)
}

/// Initialize the default store with `initial`.
///
/// # Errors
///
/// [`StoreError::AlreadyInitialized`] on any call after the first on this
/// thread. The existing state is kept.
pub fn init_state(initial: impl Into<Value>) -> Result<()> {
    DEFAULT_STORE.with(|store| store.init(initial))
}

/// Read `path` from the default store.
#[must_use]
pub fn get_state(path: &str) -> Option<Value> {
    DEFAULT_STORE.with(|store| store.get(path))
}

/// Write `path` in the default store. Returns whether anything changed.
pub fn set_state(path: &str, value: impl Into<Value>) -> bool {
    DEFAULT_STORE.with(|store| store.set(path, value))
}

/// The whole tree of the default store.
#[must_use]
pub fn get_all_state() -> Value {
    DEFAULT_STORE.with(Store::get_all)
}

/// Bind a component to one or more paths of the default store.
///
/// See [`eventsync_runtime::use_bound_state`].
pub fn use_bound_state<H: Hooks, R: PathRequest>(hooks: &mut H, request: R) -> R::Output {
    eventsync_runtime::use_bound_state(hooks, &default_store(), request)
}

pub mod prelude {
    pub use crate::{
        BoundSetters, BoundValues, Hooks, LocalState, Setter, Store, StoreConfig, StoreError,
        Value, default_store, get_all_state, get_state, init_state, set_state, use_bound_state,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventsync_harness::HeadlessHost;
    use serde_json::json;

    #[test]
    fn default_store_is_shared_within_thread() {
        assert!(default_store().ptr_eq(&default_store()));
    }

    #[test]
    fn init_twice_fails_and_keeps_state() {
        init_state(json!({"a": 1})).unwrap();
        assert_eq!(init_state(json!({"b": 2})), Err(StoreError::AlreadyInitialized));
        assert_eq!(get_state("a"), Some(Value::from(1)));
        assert_eq!(get_state("b"), None);
    }

    #[test]
    fn get_before_init_is_none() {
        assert_eq!(get_state("anything"), None);
        assert!(!default_store().is_initialized());
    }

    #[test]
    fn set_and_get_all() {
        init_state(json!({})).unwrap();
        assert!(set_state("a.b.c", 1));
        assert_eq!(get_all_state(), Value::from(json!({"a": {"b": {"c": 1}}})));
    }

    #[test]
    fn stores_are_per_thread() {
        init_state(json!({"here": true})).unwrap();
        let other = std::thread::spawn(|| get_state("here").is_none())
            .join()
            .unwrap();
        assert!(other);
        assert_eq!(get_state("here"), Some(Value::from(true)));
    }

    #[test]
    fn reentrant_set_from_handler() {
        init_state(json!({"counter": 0, "doubled": 0})).unwrap();
        default_store().subscribe(|record| {
            if record.path == "counter"
                && let Some(n) = record.value.as_i64()
            {
                set_state("doubled", n * 2);
            }
        });
        set_state("counter", 4);
        assert_eq!(get_state("doubled"), Some(Value::from(8)));
    }

    #[test]
    fn binding_uses_default_store() {
        init_state(json!({"counter": 0})).unwrap();
        let mut host = HeadlessHost::mount(|cx| use_bound_state(cx, "counter").0);
        assert_eq!(host.output(), &Some(Value::from(0)));

        set_state("counter", 1);
        assert_eq!(host.flush(), 1);
        assert_eq!(host.output(), &Some(Value::from(1)));
    }
}
