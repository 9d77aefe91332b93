//! E2E: notification coalescing under the polling strategy.
//!
//! Validates:
//! 1. N rapid mutations within one tick yield exactly one forced re-render
//!    per subscriber, and the final output is the Nth value, never an
//!    intermediate one.
//! 2. Independent subscribers coalesce independently but identically.
//! 3. Mutations in separate ticks each produce their own re-render.

#![forbid(unsafe_code)]

use tether_bind::{BindOptions, use_store_polling};
use tether_harness::TestBed;
use tether_store::Atom;

#[test]
fn burst_collapses_to_one_rerender() {
    let bed = TestBed::new();
    let counter = Atom::new(0u32);
    let store = counter.clone();
    let id = bed.mount(move |scope| {
        let value = use_store_polling(scope, &store, &BindOptions::new());
        format!("{value}")
    });
    assert_eq!(bed.renders(id), 1);

    for value in 1..=50u32 {
        counter.set(value);
    }
    bed.flush();
    assert_eq!(bed.renders(id), 1, "no re-render before the tick");

    bed.tick();
    assert_eq!(bed.renders(id), 2);
    assert_eq!(bed.text(id), "50", "committed value must be the final one");
}

#[test]
fn each_subscriber_rerenders_once_per_burst() {
    let bed = TestBed::new();
    let counter = Atom::new(0u32);

    let store = counter.clone();
    let first = bed.mount(move |scope| {
        let value = use_store_polling(scope, &store, &BindOptions::new());
        format!("a{value}")
    });
    let store = counter.clone();
    let second = bed.mount(move |scope| {
        let value = use_store_polling(scope, &store, &BindOptions::new());
        format!("b{value}")
    });

    counter.set(1);
    counter.set(2);
    counter.set(3);
    bed.tick();

    assert_eq!(bed.renders(first), 2);
    assert_eq!(bed.renders(second), 2);
    assert_eq!(bed.text(first), "a3");
    assert_eq!(bed.text(second), "b3");
}

#[test]
fn separate_ticks_rerender_separately() {
    let bed = TestBed::new();
    let counter = Atom::new(0u32);
    let store = counter.clone();
    let id = bed.mount(move |scope| {
        let value = use_store_polling(scope, &store, &BindOptions::new());
        format!("{value}")
    });

    counter.set(1);
    bed.tick();
    counter.set(2);
    counter.set(3);
    bed.tick();

    assert_eq!(bed.renders(id), 3, "one initial render plus one per tick");
    assert_eq!(bed.text(id), "3");
}

#[test]
fn equal_value_writes_do_not_rerender() {
    let bed = TestBed::new();
    let counter = Atom::new(7u32);
    let store = counter.clone();
    let id = bed.mount(move |scope| {
        let value = use_store_polling(scope, &store, &BindOptions::new());
        format!("{value}")
    });

    counter.set(7);
    counter.set(7);
    bed.tick();
    assert_eq!(bed.renders(id), 1, "no-op writes must not notify at all");
}
