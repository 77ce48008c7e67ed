#![forbid(unsafe_code)]

//! Path bindings: per-component subscriptions to slices of a [`Store`].
//!
//! # Design
//!
//! A component calls [`use_bound_state`] on every render with the paths it
//! wants. The binding keeps three things in host-provided slots:
//!
//! - the **snapshot** of last-seen values per path, which the component
//!   renders from and every change record is compared against;
//! - a **trigger** counter (a [`LocalState`]; setting it is the re-render
//!   request);
//! - one notifier **handler**, registered by an effect keyed on the path
//!   list and removed by that effect's cleanup.
//!
//! ```text
//!  Store::set ──► broadcast ──► handler
//!                                  │ root key in roots?  no ──► ignore
//!                                  ▼ yes
//!                     re-read every bound path
//!                                  │ any not same as snapshot?  no ──► ignore
//!                                  ▼ yes
//!                     update snapshot, bump trigger  (one trigger)
//! ```
//!
//! # Invariants
//!
//! 1. Records whose root key is not among the bound roots are ignored
//!    without reading the store.
//! 2. A record that passes the root filter re-reads *every* bound path, not
//!    just the written one. Only values that are not [`same`](Value::same)
//!    as the snapshot's count as changes.
//! 3. However many paths changed, the trigger fires at most once per
//!    record.
//! 4. At most one handler per component is registered. The previous one is
//!    removed before a new path list subscribes, and on teardown. Changing
//!    the path list alone never triggers: the render that sees the new list
//!    already reads it from the store.
//! 5. A handler deactivated by its cleanup does nothing, even when the
//!    broadcast that is running still holds it in its snapshot.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use eventsync_core::path;
use eventsync_core::value;
use eventsync_core::Value;
use tracing::{debug, trace, warn};

use crate::host::{Cleanup, Hooks, LocalState, cleanup};
use crate::notifier::ChangeRecord;
use crate::store::{Store, WeakStore};

/// Values of a multi-path binding, keyed by flattened path.
pub type BoundValues = BTreeMap<String, Option<Value>>;

/// Setters of a multi-path binding, keyed by `"set"` + capitalized flat key.
pub type BoundSetters = BTreeMap<String, Setter>;

/// Writes one bound path.
///
/// Holds the store weakly, so a setter captured by one of the store's own
/// handlers does not keep the store alive.
#[derive(Clone)]
pub struct Setter {
    store: WeakStore,
    path: Rc<str>,
}

impl Setter {
    #[must_use]
    pub fn new(store: &Store, path: &str) -> Self {
        Self {
            store: store.downgrade(),
            path: Rc::from(path),
        }
    }

    /// Equivalent to `store.set(path, value)`. Returns `false` once the
    /// store has been dropped.
    pub fn set(&self, value: impl Into<Value>) -> bool {
        self.store
            .upgrade()
            .is_some_and(|store| store.set(&self.path, value))
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("path", &self.path).finish()
    }
}

/// The paths a component asks for, and the shape it gets back.
///
/// A single path (`&str`, `String`) yields `(Option<Value>, Setter)`.
/// A list of paths yields `(BoundValues, BoundSetters)`.
pub trait PathRequest {
    type Output;

    fn into_paths(self) -> Vec<String>;

    fn shape(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> Self::Output;
}

fn shape_single(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> (Option<Value>, Setter) {
    let path = paths.first().map_or("", String::as_str);
    let value = values.into_iter().next().flatten();
    (value, Setter::new(store, path))
}

fn shape_many(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> (BoundValues, BoundSetters) {
    let mut bound = BoundValues::new();
    let mut setters = BoundSetters::new();
    let mut origin: BTreeMap<String, &str> = BTreeMap::new();

    for (p, v) in paths.iter().zip(values) {
        let key = store.key_of(p);
        if let Some(previous) = origin.insert(key.clone(), p)
            && previous != p.as_str()
            && store.config().warn_on_key_collision
        {
            warn!(key = %key, first = previous, second = %p, "bound paths share a flat key, later path wins");
        }
        setters.insert(path::setter_key(&key), Setter::new(store, p));
        bound.insert(key, v);
    }
    (bound, setters)
}

impl PathRequest for &str {
    type Output = (Option<Value>, Setter);

    fn into_paths(self) -> Vec<String> {
        vec![self.to_owned()]
    }

    fn shape(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> Self::Output {
        shape_single(store, paths, values)
    }
}

impl PathRequest for String {
    type Output = (Option<Value>, Setter);

    fn into_paths(self) -> Vec<String> {
        vec![self]
    }

    fn shape(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> Self::Output {
        shape_single(store, paths, values)
    }
}

impl<const N: usize> PathRequest for [&str; N] {
    type Output = (BoundValues, BoundSetters);

    fn into_paths(self) -> Vec<String> {
        self.iter().map(|p| (*p).to_owned()).collect()
    }

    fn shape(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> Self::Output {
        shape_many(store, paths, values)
    }
}

impl PathRequest for &[&str] {
    type Output = (BoundValues, BoundSetters);

    fn into_paths(self) -> Vec<String> {
        self.iter().map(|p| (*p).to_owned()).collect()
    }

    fn shape(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> Self::Output {
        shape_many(store, paths, values)
    }
}

impl PathRequest for Vec<&str> {
    type Output = (BoundValues, BoundSetters);

    fn into_paths(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }

    fn shape(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> Self::Output {
        shape_many(store, paths, values)
    }
}

impl PathRequest for Vec<String> {
    type Output = (BoundValues, BoundSetters);

    fn into_paths(self) -> Vec<String> {
        self
    }

    fn shape(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> Self::Output {
        shape_many(store, paths, values)
    }
}

impl PathRequest for &[String] {
    type Output = (BoundValues, BoundSetters);

    fn into_paths(self) -> Vec<String> {
        self.to_vec()
    }

    fn shape(store: &Store, paths: &[String], values: Vec<Option<Value>>) -> Self::Output {
        shape_many(store, paths, values)
    }
}

/// What the component renders from: values aligned with the paths they
/// were read for. Doubles as the last-seen cache the handler diffs
/// against.
struct Snapshot {
    paths: Rc<[String]>,
    values: Vec<Option<Value>>,
}

impl Snapshot {
    fn read(store: &Store, paths: &Rc<[String]>) -> Self {
        Self {
            paths: Rc::clone(paths),
            values: read_all(store, paths),
        }
    }
}

type SharedSnapshot = Rc<RefCell<Snapshot>>;

fn read_all(store: &Store, paths: &[String]) -> Vec<Option<Value>> {
    paths.iter().map(|p| store.get(p)).collect()
}

fn all_same(a: &[Option<Value>], b: &[Option<Value>]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| value::same(x.as_ref(), y.as_ref()))
}

fn bump(trigger: &dyn LocalState<u64>) {
    trigger.set(trigger.get().wrapping_add(1));
}

/// Bind a component to one or more paths of `store`.
///
/// Call on every render, in the same hook position. Returns the current
/// values and setters in the shape chosen by the request type; see
/// [`PathRequest`].
pub fn use_bound_state<H: Hooks, R: PathRequest>(
    hooks: &mut H,
    store: &Store,
    request: R,
) -> R::Output {
    let paths = request.into_paths();
    let values = bind_paths(hooks, store, &paths);
    R::shape(store, &paths, values)
}

/// Host-facing core of [`use_bound_state`]: returns the values to render,
/// aligned with `paths`.
pub fn bind_paths<H: Hooks>(hooks: &mut H, store: &Store, paths: &[String]) -> Vec<Option<Value>> {
    let paths: Rc<[String]> = paths.into();
    let snapshot: SharedSnapshot =
        hooks.local_state(|| Rc::new(RefCell::new(Snapshot::read(store, &paths)))).get();
    let trigger = hooks.local_state(|| 0u64);

    let values = {
        let mut current = snapshot.borrow_mut();
        if current.paths != paths {
            // New path list: render it straight from the store. The effect
            // resubscribes and only triggers if a value moves after this.
            *current = Snapshot::read(store, &paths);
        }
        current.values.clone()
    };

    let effect = {
        let store = store.downgrade();
        let paths = Rc::clone(&paths);
        Box::new(move || activate(store, paths, snapshot, trigger))
    };
    hooks.effect_on_change(paths.to_vec(), effect);
    values
}

/// Effect body: catch up with writes since render, register the handler,
/// return its cleanup.
fn activate(
    store: WeakStore,
    paths: Rc<[String]>,
    snapshot: SharedSnapshot,
    trigger: Rc<dyn LocalState<u64>>,
) -> Cleanup {
    let Some(live) = store.upgrade() else {
        return cleanup(|| {});
    };

    // Anything written between render and subscription is caught here.
    let fresh = read_all(&live, &paths);
    let stale = {
        let mut rendered = snapshot.borrow_mut();
        let stale = rendered.paths != paths || !all_same(&rendered.values, &fresh);
        if stale {
            *rendered = Snapshot {
                paths: Rc::clone(&paths),
                values: fresh,
            };
        }
        stale
    };
    if stale {
        bump(trigger.as_ref());
    }

    let roots: BTreeSet<String> = paths
        .iter()
        .map(|p| path::root_key(p).to_owned())
        .collect();
    let active = Rc::new(Cell::new(true));

    let id = {
        let store = store.clone();
        let active = Rc::clone(&active);
        live.subscribe(move |record| {
            if active.get() {
                on_change(record, &store, &roots, &snapshot, trigger.as_ref());
            }
        })
    };
    debug!(paths = ?&*paths, "binding subscribed");

    cleanup(move || {
        active.set(false);
        if let Some(live) = store.upgrade() {
            live.unsubscribe(id);
        }
        debug!(paths = ?&*paths, "binding torn down");
    })
}

fn on_change(
    record: &ChangeRecord,
    store: &WeakStore,
    roots: &BTreeSet<String>,
    snapshot: &RefCell<Snapshot>,
    trigger: &dyn LocalState<u64>,
) {
    if !roots.contains(record.root_key()) {
        return;
    }
    let Some(store) = store.upgrade() else {
        return;
    };

    let changed = {
        let mut snapshot = snapshot.borrow_mut();
        let Snapshot { paths, values } = &mut *snapshot;
        let mut changed = false;
        for (slot, p) in values.iter_mut().zip(paths.iter()) {
            let now = store.get(p);
            if !value::same(slot.as_ref(), now.as_ref()) {
                *slot = now;
                changed = true;
            }
        }
        changed
    };

    if changed {
        trace!(path = %record.path, "binding triggers re-render");
        bump(trigger);
    } else {
        trace!(path = %record.path, "binding woken, no bound value changed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| (*p).to_owned()).collect()
    }

    #[test]
    fn single_shape_is_value_and_setter() {
        let store = Store::new();
        let (value, setter) = shape_single(&store, &paths(&["user.name"]), vec![Some(Value::from("A"))]);
        assert_eq!(value, Some(Value::from("A")));
        assert_eq!(setter.path(), "user.name");
    }

    #[test]
    fn many_shape_uses_flat_keys() {
        let store = Store::new();
        let (values, setters) = shape_many(
            &store,
            &paths(&["user.name", "counter"]),
            vec![Some(Value::from("Alice")), Some(Value::from(0))],
        );
        assert_eq!(values.get("user_name"), Some(&Some(Value::from("Alice"))));
        assert_eq!(values.get("counter"), Some(&Some(Value::from(0))));
        let keys: Vec<&str> = setters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["setCounter", "setUser_name"]);
    }

    #[test]
    fn many_shape_respects_key_substitute() {
        let store = Store::with_config(StoreConfig::new().with_key_substitute('-'));
        let (values, setters) = shape_many(&store, &paths(&["a.b"]), vec![None]);
        assert!(values.contains_key("a-b"));
        assert!(setters.contains_key("setA-b"));
    }

    #[test]
    fn colliding_keys_keep_later_path() {
        let store = Store::with_config(StoreConfig::quiet());
        let (values, setters) = shape_many(
            &store,
            &paths(&["a.b", "a_b"]),
            vec![Some(Value::from(1)), Some(Value::from(2))],
        );
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("a_b"), Some(&Some(Value::from(2))));
        assert_eq!(setters.get("setA_b").map(Setter::path), Some("a_b"));
    }

    #[test]
    fn setter_writes_through_store() {
        let store = Store::new();
        let setter = Setter::new(&store, "a.b");
        assert!(setter.set(3));
        assert!(!setter.set(3));
        assert_eq!(store.get("a.b"), Some(Value::from(3)));
    }

    #[test]
    fn setter_does_not_keep_store_alive() {
        let store = Store::new();
        let weak = store.downgrade();
        let setter = Setter::new(&store, "a");
        store.subscribe(move |_| {
            setter.set(1);
        });
        drop(store);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn setter_after_store_dropped_is_noop() {
        let store = Store::new();
        let setter = Setter::new(&store, "a");
        drop(store);
        assert!(!setter.set(1));
    }

    #[test]
    fn request_paths() {
        assert_eq!("a.b".into_paths(), paths(&["a.b"]));
        assert_eq!(["a", "b"].into_paths(), paths(&["a", "b"]));
        assert_eq!(vec!["x".to_owned()].into_paths(), paths(&["x"]));
    }

    #[test]
    fn all_same_checks_length_and_identity() {
        let v = Value::object();
        assert!(all_same(&[Some(v.clone())], &[Some(v.clone())]));
        assert!(!all_same(&[Some(v.clone())], &[Some(Value::object())]));
        assert!(!all_same(&[None], &[None, None]));
    }
}
