#![forbid(unsafe_code)]

//! Broadcast channel for change records.
//!
//! # Design
//!
//! [`ChangeNotifier`] is a cheap-clone handle to a shared, ordered list of
//! handlers (`Rc<RefCell<..>>`). It knows nothing about what a handler is
//! interested in: every registered handler receives every record, and
//! filtering is the subscriber's job.
//!
//! # Invariants
//!
//! 1. Handlers are invoked in registration order.
//! 2. A broadcast iterates a snapshot taken when it starts. Handlers added
//!    or removed mid-broadcast do not change who receives that record.
//! 3. No internal borrow is held while a handler runs, so handlers may
//!    subscribe, unsubscribe or broadcast re-entrantly.
//! 4. Registering the same closure twice yields two independent entries.
//!
//! # Failure Modes
//!
//! - **Unknown id**: `unsubscribe` of an id that is not registered is a
//!   no-op and returns `false`.
//! - **Deep re-entrancy**: a handler that broadcasts from inside a broadcast
//!   runs the nested broadcast to completion first. Later handlers of the
//!   outer broadcast wait; nothing bounds the nesting depth.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use eventsync_core::Value;
use eventsync_core::path;

/// A change that was just written: the path and its new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub path: String,
    pub value: Value,
}

impl ChangeRecord {
    #[must_use]
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    /// Root key of the written path.
    #[must_use]
    pub fn root_key(&self) -> &str {
        path::root_key(&self.path)
    }
}

/// Identifier of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

type Handler = Rc<dyn Fn(&ChangeRecord)>;

struct NotifierInner {
    next_id: u64,
    handlers: Vec<(HandlerId, Handler)>,
}

/// Fan-out of [`ChangeRecord`]s to registered handlers.
///
/// Cloning a `ChangeNotifier` creates a new handle to the **same** handler
/// list.
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Rc<RefCell<NotifierInner>>,
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(NotifierInner {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Register `handler` for every future record until unsubscribed.
    pub fn subscribe(&self, handler: impl Fn(&ChangeRecord) + 'static) -> HandlerId {
        let mut inner = self.inner.borrow_mut();
        let id = HandlerId(inner.next_id);
        inner.next_id += 1;
        inner.handlers.push((id, Rc::new(handler)));
        id
    }

    /// Register `handler` and return a guard that unsubscribes it on drop.
    pub fn subscribe_guard(&self, handler: impl Fn(&ChangeRecord) + 'static) -> Subscription {
        let id = self.subscribe(handler);
        Subscription {
            notifier: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let pos = inner.handlers.iter().position(|(hid, _)| *hid == id);
            pos.map(|pos| inner.handlers.remove(pos))
        };
        // Dropped here, outside the borrow: the closure may own guards that
        // unsubscribe in turn.
        removed.is_some()
    }

    /// Invoke every registered handler with `record`. Returns how many
    /// handlers were invoked.
    pub fn broadcast(&self, record: &ChangeRecord) -> usize {
        let snapshot: Vec<Handler> = self
            .inner
            .borrow()
            .handlers
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();

        for handler in &snapshot {
            handler(record);
        }
        snapshot.len()
    }

    /// Number of currently registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }
}

/// RAII guard for a handler registered through
/// [`ChangeNotifier::subscribe_guard`].
///
/// Holds only a weak reference to the notifier, so a guard outliving its
/// notifier is harmless.
pub struct Subscription {
    notifier: Weak<RefCell<NotifierInner>>,
    id: HandlerId,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.notifier.upgrade() {
            ChangeNotifier { inner }.unsubscribe(self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
