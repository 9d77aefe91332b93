//! E2E: selectors narrow the projected value, never the change triggering.
//!
//! Validates:
//! 1. Two siblings selecting different fields of one store (no key
//!    filter) both re-render on the store's raw notifications under the
//!    polling strategy, even when a sibling's selected field is untouched.
//! 2. The tear-free strategy elides value-preserving re-renders, which is
//!    its documented change-detecting behavior.
//! 3. The derived-value strategy yields a stable, composable handle.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tether_bind::{BindOptions, use_store_signal, use_store_polling, use_store_with};
use tether_harness::TestBed;
use tether_runtime::Derived;
use tether_store::{AHashMap, MapStore};

fn point_store() -> MapStore<&'static str, i32> {
    MapStore::from_entries([("x", 1), ("y", 2)])
}

#[test]
fn sibling_selectors_rerender_on_raw_notifications() {
    let bed = TestBed::new();
    let point = point_store();

    let store = point.clone();
    let select_x = bed.mount(move |scope| {
        let x = use_store_polling(
            scope,
            &store,
            &BindOptions::new().selector(|map: &AHashMap<&str, i32>| map.get("x").copied().unwrap_or(0)),
        );
        format!("x={x}")
    });
    let store = point.clone();
    let select_y = bed.mount(move |scope| {
        let y = use_store_polling(
            scope,
            &store,
            &BindOptions::new().selector(|map: &AHashMap<&str, i32>| map.get("y").copied().unwrap_or(0)),
        );
        format!("y={y}")
    });

    point.set_key("y", 9);
    bed.tick();

    assert_eq!(bed.text(select_y), "y=9");
    assert_eq!(
        bed.renders(select_x),
        2,
        "selector must not narrow change triggering"
    );
    assert_eq!(bed.text(select_x), "x=1");
}

#[test]
fn tear_free_elides_value_preserving_rerenders() {
    let bed = TestBed::new();
    let point = point_store();

    let store = point.clone();
    let select_x = bed.mount(move |scope| {
        let x = use_store_with(
            scope,
            &store,
            &BindOptions::new().selector(|map: &AHashMap<&str, i32>| map.get("x").copied().unwrap_or(0)),
        );
        format!("x={x}")
    });

    point.set_key("y", 9);
    bed.flush();
    assert_eq!(
        bed.renders(select_x),
        1,
        "unchanged selected snapshot commits nothing new"
    );

    point.set_key("x", 5);
    bed.flush();
    assert_eq!(bed.renders(select_x), 2);
    assert_eq!(bed.text(select_x), "x=5");
}

#[test]
fn derived_handle_is_stable_and_composes() {
    let bed = TestBed::new();
    let point = point_store();
    let handles: Rc<RefCell<Vec<Derived<i32>>>> = Rc::new(RefCell::new(Vec::new()));

    let store = point.clone();
    let seen = Rc::clone(&handles);
    let id = bed.mount(move |scope| {
        let x = use_store_signal(
            scope,
            &store,
            &BindOptions::new().selector(|map: &AHashMap<&str, i32>| map.get("x").copied().unwrap_or(0)),
        );
        seen.borrow_mut().push(x.clone());
        format!("x={}", x.get())
    });
    assert_eq!(bed.text(id), "x=1");

    point.set_key("x", 4);
    bed.flush();
    assert_eq!(bed.text(id), "x=4");

    let handles = handles.borrow();
    assert!(handles.len() >= 2);
    assert_eq!(
        handles[0].get(),
        4,
        "the first render's handle must track later values"
    );
}
