//! Property-based invariants for keyed notification on whole-map writes.
//!
//! For **any** pair of old/new mappings:
//!
//! 1. A listener on key `k` fires iff `old[k] != new[k]` (insertions and
//!    removals included).
//! 2. A plain listener fires iff the mappings differ at all.
//! 3. A listener fires at most once per `set`, however many of its keys
//!    changed.

#![forbid(unsafe_code)]

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;

use tether_store::{AHashMap, MapStore, Store};

const KEYS: [&str; 5] = ["a", "b", "c", "d", "e"];

fn arbitrary_map() -> impl Strategy<Value = AHashMap<&'static str, u8>> {
    proptest::collection::vec((0usize..KEYS.len(), 0u8..4), 0..6)
        .prop_map(|pairs| pairs.into_iter().map(|(k, v)| (KEYS[k], v)).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn keyed_listener_fires_iff_its_key_changed(
        old in arbitrary_map(),
        new in arbitrary_map(),
        watched in 0usize..KEYS.len(),
    ) {
        let watched = KEYS[watched];
        let store: MapStore<&'static str, u8> = MapStore::from_entries(old.clone());

        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        let _sub = store.listen_keys(&[watched], Box::new(move || h.set(h.get() + 1)));

        store.set(new.clone());

        let expected = u32::from(old.get(watched) != new.get(watched));
        prop_assert_eq!(hits.get(), expected);
    }

    #[test]
    fn plain_listener_fires_iff_maps_differ(
        old in arbitrary_map(),
        new in arbitrary_map(),
    ) {
        let store: MapStore<&'static str, u8> = MapStore::from_entries(old.clone());

        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        let _sub = store.listen(Box::new(move || h.set(h.get() + 1)));

        store.set(new.clone());

        let expected = u32::from(old != new);
        prop_assert_eq!(hits.get(), expected);
    }

    #[test]
    fn multi_key_listener_fires_at_most_once_per_set(
        old in arbitrary_map(),
        new in arbitrary_map(),
    ) {
        let store: MapStore<&'static str, u8> = MapStore::from_entries(old);

        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        let _sub = store.listen_keys(&KEYS, Box::new(move || h.set(h.get() + 1)));

        store.set(new);
        prop_assert!(hits.get() <= 1);
    }
}
