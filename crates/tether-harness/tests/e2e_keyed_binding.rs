//! E2E: key-filtered bindings against a keyed store.
//!
//! Validates:
//! 1. With `keys: ["a"]`, a mutation of key `b` alone never increments the
//!    render count, while a mutation of `a` does.
//! 2. Growing the key set from `["a"]` to `["a", "b"]` on a later render
//!    makes subsequent `b` mutations observable, without re-delivering
//!    stale values for keys already known.
//! 3. The same filtering holds under the tear-free strategy.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tether_bind::{BindOptions, use_store_polling, use_store_with};
use tether_harness::TestBed;
use tether_store::{AHashMap, MapStore};

fn render_pair(map: &AHashMap<&'static str, String>) -> String {
    let a = map.get("a").cloned().unwrap_or_else(|| "_".to_string());
    let b = map.get("b").cloned().unwrap_or_else(|| "_".to_string());
    format!("map:{a}-{b}")
}

#[test]
fn keyed_filtering_ignores_unlistened_keys() {
    let bed = TestBed::new();
    let map: MapStore<&'static str, String> = MapStore::new();

    let store = map.clone();
    let id = bed.mount(move |scope| {
        let value = use_store_polling(scope, &store, &BindOptions::new().keys(["a"]));
        render_pair(&value)
    });
    assert_eq!(bed.text(id), "map:_-_");
    assert_eq!(bed.renders(id), 1);

    map.set_key("a", "a".to_string());
    bed.tick();
    assert_eq!(bed.text(id), "map:a-_");
    assert_eq!(bed.renders(id), 2);

    map.set_key("b", "b".to_string());
    bed.tick();
    assert_eq!(bed.renders(id), 2, "unlistened key must not re-render");
    assert_eq!(bed.text(id), "map:a-_", "stale paint is expected until a relevant change");
}

#[test]
fn growing_the_key_set_picks_up_new_keys() {
    let bed = TestBed::new();
    let map: MapStore<&'static str, String> = MapStore::new();
    let keys: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(vec!["a"]));

    let store = map.clone();
    let active_keys = Rc::clone(&keys);
    let id = bed.mount(move |scope| {
        let filter = active_keys.borrow().clone();
        let value = use_store_polling(scope, &store, &BindOptions::new().keys(filter));
        render_pair(&value)
    });
    assert_eq!(bed.renders(id), 1);

    // Whole-map write touching "a": observed.
    map.set(AHashMap::from_iter([
        ("a", "a".to_string()),
        ("b", "b0".to_string()),
    ]));
    bed.tick();
    assert_eq!(bed.renders(id), 2);
    assert_eq!(bed.text(id), "map:a-b0");

    // "b" alone: filtered out.
    map.set_key("b", "b1".to_string());
    bed.tick();
    assert_eq!(bed.renders(id), 2);

    // Parent render changes the filter; the binding re-subscribes.
    *keys.borrow_mut() = vec!["a", "b"];
    bed.invalidate(id);
    let after_switch = bed.renders(id);
    assert_eq!(
        bed.text(id),
        "map:a-b1",
        "switch must not re-deliver stale values, just re-read"
    );

    map.set_key("b", "b2".to_string());
    bed.tick();
    assert_eq!(bed.renders(id), after_switch + 1, "b is now observed");
    assert_eq!(bed.text(id), "map:a-b2");
}

#[test]
fn keyed_filtering_under_tear_free() {
    let bed = TestBed::new();
    let map: MapStore<&'static str, String> = MapStore::new();

    let store = map.clone();
    let id = bed.mount(move |scope| {
        let value = use_store_with(scope, &store, &BindOptions::new().keys(["a"]));
        render_pair(&value)
    });

    map.set_key("b", "b".to_string());
    bed.flush();
    assert_eq!(bed.renders(id), 1, "no notification, no re-render");

    map.set_key("a", "a".to_string());
    bed.flush();
    assert_eq!(bed.renders(id), 2);
    assert_eq!(bed.text(id), "map:a-b", "re-render re-reads the whole snapshot");
}
