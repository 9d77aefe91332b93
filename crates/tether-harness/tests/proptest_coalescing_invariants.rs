//! Property-based invariants for notification coalescing.
//!
//! For **any** schedule of value-changing write bursts separated by ticks:
//!
//! 1. Each burst produces exactly one re-render per subscriber.
//! 2. The committed output after each tick equals the burst's final value.
//! 3. The total render count is `1 + number of bursts`.

#![forbid(unsafe_code)]

use proptest::prelude::*;

use tether_bind::{BindOptions, use_store_polling};
use tether_harness::TestBed;
use tether_store::Atom;

fn burst_sizes() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(1usize..=8, 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_burst_schedule_collapses_per_tick(bursts in burst_sizes()) {
        let bed = TestBed::new();
        let counter = Atom::new(0u64);
        let store = counter.clone();
        let id = bed.mount(move |scope| {
            let value = use_store_polling(scope, &store, &BindOptions::new());
            format!("{value}")
        });
        prop_assert_eq!(bed.renders(id), 1);

        let mut next = 0u64;
        for (index, size) in bursts.iter().enumerate() {
            for _ in 0..*size {
                next += 1;
                counter.set(next);
            }
            bed.tick();
            prop_assert_eq!(bed.renders(id), 2 + index as u64);
            prop_assert_eq!(bed.text(id), format!("{next}"));
        }
        prop_assert_eq!(bed.renders(id), 1 + bursts.len() as u64);
    }

    #[test]
    fn idle_ticks_never_rerender(ticks in 0usize..8) {
        let bed = TestBed::new();
        let counter = Atom::new(0u64);
        let store = counter.clone();
        let id = bed.mount(move |scope| {
            let value = use_store_polling(scope, &store, &BindOptions::new());
            format!("{value}")
        });

        for _ in 0..ticks {
            bed.tick();
        }
        prop_assert_eq!(bed.renders(id), 1);
    }
}
