//! Property-based invariant tests for path bindings.
//!
//! For any bound path set and any sequence of writes:
//!
//! 1. A write triggers the component exactly once if some bound value is
//!    no longer the same value, and not at all otherwise.
//! 2. After a flush, the rendered values equal what the store holds.
//! 3. The component owns exactly one notifier handler while mounted and
//!    none after unmount.

use eventsync_core::{Value, value};
use eventsync_harness::HeadlessHost;
use eventsync_runtime::{BoundValues, Store, StoreConfig, use_bound_state};
use proptest::prelude::*;
use serde_json::json;

const UNIVERSE: [&str; 7] = ["a", "a.x", "a.y", "b", "b.z", "c", "a.x.deep"];

// ── Strategies ────────────────────────────────────────────────────────────

fn bound_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(UNIVERSE.to_vec(), 1..=UNIVERSE.len())
}

fn written_value() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        (0i64..3).prop_map(|n| json!(n)),
        Just(json!(null)),
        (0i64..3).prop_map(|n| json!({"x": n})),
        Just(json!({})),
    ]
}

fn write_strategy() -> impl Strategy<Value = Vec<(&'static str, serde_json::Value)>> {
    prop::collection::vec(
        (proptest::sample::select(UNIVERSE.to_vec()), written_value()),
        1..24,
    )
}

fn fresh_store() -> Store {
    let store = Store::with_config(StoreConfig::quiet());
    store
        .init(json!({"a": {"x": 0, "y": 0}, "b": {"z": 0}, "c": 0}))
        .expect("fresh store");
    store
}

fn read(store: &Store, paths: &[&str]) -> Vec<Option<Value>> {
    paths.iter().map(|p| store.get(p)).collect()
}

fn rendered(output: &BoundValues, store: &Store, paths: &[&str]) -> Vec<Option<Value>> {
    paths
        .iter()
        .map(|p| output.get(&store.key_of(p)).cloned().flatten())
        .collect()
}

// ── Properties ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn trigger_iff_bound_value_changed(
        bound in bound_strategy(),
        writes in write_strategy(),
    ) {
        let store = fresh_store();
        let mut host = {
            let store = store.clone();
            let bound = bound.clone();
            HeadlessHost::mount(move |cx| use_bound_state(cx, &store, bound.clone()).0)
        };

        for (path, written) in writes {
            let before = read(&store, &bound);
            let triggers = host.trigger_count();

            store.set(path, written);

            let after = read(&store, &bound);
            let changed = before
                .iter()
                .zip(&after)
                .any(|(b, a)| !value::same(b.as_ref(), a.as_ref()));
            prop_assert_eq!(host.trigger_count() - triggers, usize::from(changed));

            host.flush();
            prop_assert_eq!(rendered(host.output(), &store, &bound), after);
        }
    }

    #[test]
    fn one_handler_while_mounted(
        bound in bound_strategy(),
        writes in write_strategy(),
    ) {
        let store = fresh_store();
        let mut host = {
            let store = store.clone();
            let bound = bound.clone();
            HeadlessHost::mount(move |cx| use_bound_state(cx, &store, bound.clone()).0)
        };

        for (path, written) in writes {
            store.set(path, written);
            host.flush();
            prop_assert_eq!(store.notifier().handler_count(), 1);
        }

        host.unmount();
        prop_assert_eq!(store.notifier().handler_count(), 0);
    }
}
