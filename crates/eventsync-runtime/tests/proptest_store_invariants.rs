//! Property-based invariant tests for the store.
//!
//! 1. Writing back the value already at a path changes nothing and
//!    broadcasts nothing.
//! 2. After any write, reading the path yields the written value.
//! 3. Every effective write is broadcast exactly once, in write order,
//!    with the written path.
//! 4. Values captured from other root keys survive a write untouched.

use std::cell::RefCell;
use std::rc::Rc;

use eventsync_runtime::{Store, StoreConfig, Value};
use proptest::prelude::*;
use serde_json::json;

// ── Strategies ────────────────────────────────────────────────────────────

fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            proptest::sample::select(vec!["a", "b", "c", "x"]).prop_map(str::to_owned),
            (0usize..3).prop_map(|i| i.to_string()),
        ],
        1..4,
    )
    .prop_map(|segments| segments.join("."))
}

fn value_strategy() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        any::<bool>().prop_map(|b| json!(b)),
        (-5i64..5).prop_map(|n| json!(n)),
        "[a-z]{0,3}".prop_map(|s| json!(s)),
        Just(json!(null)),
        (-5i64..5).prop_map(|n| json!({"a": n})),
        (-5i64..5).prop_map(|n| json!([n])),
    ]
}

fn fresh_store() -> Store {
    let store = Store::with_config(StoreConfig::quiet());
    store
        .init(json!({"a": {"b": 1}, "b": [1, 2], "c": "text"}))
        .expect("fresh store");
    store
}

fn root(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

// ── Properties ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn writing_current_value_is_noop(
        writes in prop::collection::vec((path_strategy(), value_strategy()), 0..8),
        probe in path_strategy(),
    ) {
        let store = fresh_store();
        for (path, value) in writes {
            store.set(&path, value);
        }
        let broadcasts = Rc::new(RefCell::new(0usize));
        let counter = Rc::clone(&broadcasts);
        store.subscribe(move |_| *counter.borrow_mut() += 1);

        let before = store.get_all();
        if let Some(current) = store.get(&probe) {
            prop_assert!(!store.set(&probe, current));
            prop_assert!(store.get_all().same(&before));
            prop_assert_eq!(*broadcasts.borrow(), 0);
        }
    }

    #[test]
    fn write_then_read_yields_written_value(
        writes in prop::collection::vec((path_strategy(), value_strategy()), 1..12),
    ) {
        let store = fresh_store();
        for (path, value) in writes {
            let value = Value::from(value);
            store.set(&path, value.clone());
            let read = store.get(&path);
            prop_assert!(read.as_ref().is_some_and(|r| r.same(&value)));
        }
    }

    #[test]
    fn effective_writes_broadcast_in_order(
        writes in prop::collection::vec((path_strategy(), value_strategy()), 1..12),
    ) {
        let store = fresh_store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |record| sink.borrow_mut().push(record.path.clone()));

        let mut expected = Vec::new();
        for (path, value) in writes {
            if store.set(&path, value) {
                expected.push(path);
            }
        }
        prop_assert_eq!(&*seen.borrow(), &expected);
    }

    #[test]
    fn other_roots_keep_identity(
        path in path_strategy(),
        value in value_strategy(),
    ) {
        let store = fresh_store();
        let captured: Vec<(&str, Option<Value>)> = ["a", "b", "c", "x"]
            .into_iter()
            .map(|key| (key, store.get(key)))
            .collect();

        store.set(&path, value);

        for (key, before) in captured {
            if key != root(&path) {
                let after = store.get(key);
                prop_assert!(eventsync_core::value::same(before.as_ref(), after.as_ref()));
            }
        }
    }
}
