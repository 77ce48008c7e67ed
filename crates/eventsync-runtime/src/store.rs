#![forbid(unsafe_code)]

//! The shared state tree and its single write path.
//!
//! # Design
//!
//! [`Store`] is a cheap-clone handle (`Rc`) to one state tree, an
//! initialized flag, a [`ChangeNotifier`] and a [`StoreConfig`]. Stores are
//! ordinary values: tests build as many isolated instances as they like,
//! and the facade crate keeps one thread-local default.
//!
//! # Invariants
//!
//! 1. [`Store::set`] is the only operation that replaces the tree after
//!    initialization.
//! 2. A write builds a new root; containers that existed before the write
//!    are never mutated.
//! 3. `set(path, v)` where `v` is [`same`](Value::same) as the current
//!    value is a no-op: the root keeps its identity and nothing is
//!    broadcast.
//! 4. `init` succeeds at most once per store.
//! 5. The tree borrow is released before handlers run, so `get` and `set`
//!    are callable from inside a handler.
//!
//! # Failure Modes
//!
//! - **Second `init`**: returns [`StoreError::AlreadyInitialized`]; the
//!   tree is untouched.
//! - **Write through a scalar**: the scalar is replaced by an object.
//!   A warning is logged when `warn_on_scalar_overwrite` is set.
//! - **Deeply nested re-entrant `set`**: each nested write broadcasts to
//!   completion before the outer broadcast resumes. Nothing bounds the
//!   depth.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use eventsync_core::path::{self, DEFAULT_KEY_SUBSTITUTE};
use eventsync_core::{Map, Result, StoreError, Value};
use tracing::{debug, info, trace, warn};

use crate::notifier::{ChangeNotifier, ChangeRecord, HandlerId, Subscription};

/// Configuration for a [`Store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Character substituted for `.` when flattening paths into keys.
    pub key_substitute: char,
    /// Log a warning when a multi-path binding maps two paths to one key.
    pub warn_on_key_collision: bool,
    /// Log a warning when a write discards a scalar on its spine.
    pub warn_on_scalar_overwrite: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_substitute: DEFAULT_KEY_SUBSTITUTE,
            warn_on_key_collision: true,
            warn_on_scalar_overwrite: true,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the separator substitute used by [`Store::key_of`].
    #[must_use]
    pub fn with_key_substitute(mut self, substitute: char) -> Self {
        self.key_substitute = substitute;
        self
    }

    #[must_use]
    pub fn with_key_collision_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_key_collision = enabled;
        self
    }

    #[must_use]
    pub fn with_scalar_overwrite_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_scalar_overwrite = enabled;
        self
    }

    /// Configuration with every warning disabled.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            warn_on_key_collision: false,
            warn_on_scalar_overwrite: false,
            ..Self::default()
        }
    }
}

struct StoreInner {
    tree: RefCell<Value>,
    initialized: Cell<bool>,
    notifier: ChangeNotifier,
    config: StoreConfig,
}

/// Path-addressed shared state with change broadcast.
///
/// Cloning a `Store` creates a new handle to the **same** tree and
/// notifier.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

/// Non-owning handle to a [`Store`], for handlers that must not keep the
/// store alive.
#[derive(Clone)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    #[must_use]
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("tree", &*self.inner.tree.borrow())
            .field("initialized", &self.inner.initialized.get())
            .field("handler_count", &self.inner.notifier.handler_count())
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an uninitialized store holding an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                tree: RefCell::new(Value::object()),
                initialized: Cell::new(false),
                notifier: ChangeNotifier::new(),
                config,
            }),
        }
    }

    /// Adopt `initial` as the state tree.
    ///
    /// An object root is shallow-copied, so the store never shares its
    /// root container with the caller. Nothing is broadcast.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyInitialized`] if the store was initialized
    /// before. The existing tree is left untouched.
    pub fn init(&self, initial: impl Into<Value>) -> Result<()> {
        if self.inner.initialized.get() {
            warn!("rejected second state initialization");
            return Err(StoreError::AlreadyInitialized);
        }
        let initial = match initial.into() {
            Value::Object(map) => Value::Object(Rc::new(Map::clone(&map))),
            other => other,
        };
        info!(root = initial.kind(), "state initialized");
        *self.inner.tree.borrow_mut() = initial;
        self.inner.initialized.set(true);
        Ok(())
    }

    /// Initialize with an empty object.
    ///
    /// # Errors
    ///
    /// Same as [`Store::init`].
    pub fn init_default(&self) -> Result<()> {
        self.init(Value::object())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    /// Read the value at `path`. Safe to call before `init`.
    ///
    /// The returned value shares containers with the live tree.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        path::read(&self.inner.tree.borrow(), path).cloned()
    }

    /// Write `value` at `path` and broadcast the change.
    ///
    /// Returns `false`, without side effects, when the current value is
    /// [`same`](Value::same) as `value`.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let next = {
            let tree = self.inner.tree.borrow();
            if path::read(&tree, path).is_some_and(|current| current.same(&value)) {
                trace!(path, "set skipped, value unchanged");
                return false;
            }
            if self.inner.config.warn_on_scalar_overwrite
                && let Some(prefix) = path::overwritten_scalar(&tree, path)
            {
                warn!(path, discarded = %prefix, "write replaces a non-container value");
            }
            path::write(&tree, path, value.clone())
        };
        *self.inner.tree.borrow_mut() = next;

        let record = ChangeRecord::new(path, value);
        debug!(
            path,
            handlers = self.inner.notifier.handler_count(),
            "broadcasting change"
        );
        self.inner.notifier.broadcast(&record);
        true
    }

    /// The live root of the tree.
    #[must_use]
    pub fn get_all(&self) -> Value {
        self.inner.tree.borrow().clone()
    }

    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.inner.notifier
    }

    /// Register a handler for every change record of this store.
    pub fn subscribe(&self, handler: impl Fn(&ChangeRecord) + 'static) -> HandlerId {
        self.inner.notifier.subscribe(handler)
    }

    /// Register a handler and return a guard that unsubscribes on drop.
    pub fn subscribe_guard(&self, handler: impl Fn(&ChangeRecord) + 'static) -> Subscription {
        self.inner.notifier.subscribe_guard(handler)
    }

    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.inner.notifier.unsubscribe(id)
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Flatten `path` with this store's separator substitute.
    #[must_use]
    pub fn key_of(&self, path: &str) -> String {
        path::key_of(path, self.inner.config.key_substitute)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
