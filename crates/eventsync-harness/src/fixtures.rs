#![forbid(unsafe_code)]

//! Shared fixtures for binding tests.

use std::cell::RefCell;
use std::rc::Rc;

use eventsync_core::Value;
use eventsync_runtime::{ChangeRecord, Store, StoreConfig};

/// A store initialized with `{user: {name: "Alice"}, counter: 0}`.
#[must_use]
pub fn seeded_store() -> Store {
    let store = Store::with_config(StoreConfig::quiet());
    let mut user = eventsync_core::Map::new();
    user.insert("name".to_owned(), Value::from("Alice"));
    let mut root = eventsync_core::Map::new();
    root.insert("user".to_owned(), Value::from(user));
    root.insert("counter".to_owned(), Value::from(0));
    if let Err(err) = store.init(root) {
        unreachable!("fresh store rejected init: {err}");
    }
    store
}

/// Record every change broadcast by `store`.
#[must_use]
pub fn record_changes(store: &Store) -> Rc<RefCell<Vec<ChangeRecord>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    store.subscribe(move |record| sink.borrow_mut().push(record.clone()));
    log
}
