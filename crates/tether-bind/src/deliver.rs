#![forbid(unsafe_code)]

//! Delivery strategies: three interchangeable ways to move a store's
//! snapshot into a render loop on change.
//!
//! All three consume the same [`StoreBinding`] pair and satisfy the same
//! contract (the committed output reflects the freshest snapshot, and a
//! detached component is never touched) but differ in re-render cadence:
//!
//! | Strategy | Re-render on | Cadence under bursts |
//! |---|---|---|
//! | [`TearFree`] | snapshot value change | once per flush |
//! | [`Coalesced`] | any notification | at most once per tick |
//! | [`DerivedCell`] | as [`TearFree`] | as [`TearFree`], cell updated per render |
//!
//! The cadence difference is not a contract; pick one primary strategy per
//! runtime and treat the others as compatibility modes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;
use web_time::Duration;

use tether_core::{Cleanup, Scheduler, TaskHandle};
use tether_runtime::{Derived, Scope, Signal};

use crate::binding::StoreBinding;

/// Delay of the coalescing window: a zero-delay single-shot timer, firing
/// on the next scheduler tick. Every notification landing while the timer
/// is armed collapses into the single re-render it produces.
pub const COALESCING_TICK: Duration = Duration::ZERO;

/// A way to deliver the current store snapshot to a render loop on change.
pub trait Deliver {
    /// What the consuming component receives each render.
    type Output<R: Clone + PartialEq + 'static>;

    /// Adapt the binding pair for one component render.
    fn deliver<R: Clone + PartialEq + 'static>(
        scope: &mut Scope<'_>,
        binding: StoreBinding<R>,
    ) -> Self::Output<R>;
}

/// Strategy backed by the runtime's tear-free external-snapshot primitive.
///
/// Adds no state of its own: the runtime guarantees render/subscription
/// consistency, re-renders on pre-commit drift, and reconciles writes that
/// land between render and subscription registration.
pub struct TearFree;

impl Deliver for TearFree {
    type Output<R: Clone + PartialEq + 'static> = R;

    fn deliver<R: Clone + PartialEq + 'static>(
        scope: &mut Scope<'_>,
        binding: StoreBinding<R>,
    ) -> R {
        let identity = binding.identity();
        scope.use_external(binding.subscribe, binding.get_snapshot, identity)
    }
}

/// Coalesced polling fallback for runtimes without a native tear-free
/// primitive.
///
/// Per mounted instance: the first render captures a baseline snapshot
/// before any subscription exists; the first post-commit effect compares
/// it against the live value and forces one reconciling re-render only on
/// mismatch. Notifications arm a single-shot tick timer and set a batching
/// flag; while armed, further notifications are absorbed, so a synchronous
/// burst of writes produces exactly one re-render. Unmount cleanup drops
/// the subscription and cancels a pending timer, so no force-render can
/// reach a detached component.
pub struct Coalesced;

impl Deliver for Coalesced {
    type Output<R: Clone + PartialEq + 'static> = R;

    fn deliver<R: Clone + PartialEq + 'static>(
        scope: &mut Scope<'_>,
        binding: StoreBinding<R>,
    ) -> R {
        let marker = scope.marker();

        let baseline = {
            let gs = Rc::clone(&binding.get_snapshot);
            scope.use_slot(move || (gs)())
        };
        {
            let gs = Rc::clone(&binding.get_snapshot);
            let baseline = Rc::clone(&baseline);
            let marker = marker.clone();
            scope.use_effect_once(move || {
                if *baseline.borrow() != (gs)() {
                    trace!("baseline drifted before first effect, reconciling");
                    marker.bump();
                }
                None
            });
        }

        {
            let subscribe = Rc::clone(&binding.subscribe);
            let marker = marker.clone();
            let scheduler = Scheduler::current();
            scope.use_effect(binding.identity(), move || {
                let batching = Rc::new(Cell::new(false));
                let timer: Rc<RefCell<Option<TaskHandle>>> = Rc::new(RefCell::new(None));

                let cb_batching = Rc::clone(&batching);
                let cb_timer = Rc::clone(&timer);
                let sub = subscribe(Box::new(move || {
                    if cb_batching.get() {
                        return;
                    }
                    cb_batching.set(true);
                    let fire_batching = Rc::clone(&cb_batching);
                    let fire_marker = marker.clone();
                    let handle = scheduler.defer_after(COALESCING_TICK, move || {
                        fire_batching.set(false);
                        fire_marker.bump();
                    });
                    *cb_timer.borrow_mut() = Some(handle);
                }));

                Some(Box::new(move || {
                    drop(sub);
                    if let Some(handle) = timer.borrow_mut().take() {
                        handle.cancel();
                    }
                }) as Cleanup)
            });
        }

        binding.snapshot()
    }
}

/// Strategy wrapping the tear-free live value in a reactive cell.
///
/// Delivery itself rides on [`TearFree`]: the component re-renders on
/// snapshot changes exactly as with [`use_store`](crate::use_store). Each
/// render folds the live value into a stable [`Signal`] slot (an equal
/// value is a no-op) and returns a [`Derived`] created once per binding
/// and reused across re-renders, so downstream consumers can compose
/// further derivations without re-subscribing to the raw store.
pub struct DerivedCell;

impl Deliver for DerivedCell {
    type Output<R: Clone + PartialEq + 'static> = Derived<R>;

    fn deliver<R: Clone + PartialEq + 'static>(
        scope: &mut Scope<'_>,
        binding: StoreBinding<R>,
    ) -> Derived<R> {
        let value = TearFree::deliver(scope, binding);

        let cache: Signal<R> = {
            let initial = value.clone();
            scope.use_signal(move || initial)
        };
        cache.set(value);

        let derived = {
            let cache = cache.clone();
            scope.use_derived(move || Derived::map(&cache, |value| value.clone()))
        };
        derived
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BindOptions;
    use tether_runtime::Runtime;
    use tether_store::Atom;

    #[test]
    fn tear_free_tracks_value_changes() {
        let runtime = Runtime::new();
        let atom = Atom::new(1);
        let bound = atom.clone();
        let id = runtime.mount(move |scope| {
            let value = crate::use_store(scope, &bound);
            format!("{value}")
        });
        runtime.flush();
        assert_eq!(runtime.text(id).as_deref(), Some("1"));

        atom.set(2);
        runtime.flush();
        assert_eq!(runtime.text(id).as_deref(), Some("2"));
    }

    #[test]
    fn coalesced_defers_to_next_tick() {
        let runtime = Runtime::new();
        let scheduler = runtime.scheduler();
        let atom = Atom::new(0);
        let bound = atom.clone();
        let id = runtime.mount(move |scope| {
            let value = crate::use_store_polling(scope, &bound, &BindOptions::new());
            format!("{value}")
        });
        runtime.flush();
        assert_eq!(runtime.renders(id), Some(1));

        atom.set(1);
        atom.set(2);
        atom.set(3);
        runtime.flush();
        assert_eq!(
            runtime.renders(id),
            Some(1),
            "burst must not re-render before the tick"
        );

        scheduler.tick();
        assert_eq!(runtime.renders(id), Some(2));
        assert_eq!(runtime.text(id).as_deref(), Some("3"));
    }

    #[test]
    fn coalesced_unmount_cancels_pending_timer() {
        let runtime = Runtime::new();
        let scheduler = runtime.scheduler();
        let atom = Atom::new(0);
        let bound = atom.clone();
        let id = runtime.mount(move |scope| {
            let value = crate::use_store_polling(scope, &bound, &BindOptions::new());
            format!("{value}")
        });
        runtime.flush();

        atom.set(1);
        runtime.unmount(id);
        // The armed coalescing timer must have been cancelled with the
        // subscription; firing the tick must be harmless.
        scheduler.tick();
        assert_eq!(runtime.text(id), None);
    }

    #[test]
    fn derived_cell_output_is_stable_and_composable() {
        let runtime = Runtime::new();
        let atom = Atom::new(2);
        let handles: Rc<RefCell<Vec<Derived<i32>>>> = Rc::new(RefCell::new(Vec::new()));
        let bound = atom.clone();
        let h = Rc::clone(&handles);
        let id = runtime.mount(move |scope| {
            let derived = crate::use_store_signal(scope, &bound, &BindOptions::new());
            h.borrow_mut().push(derived.clone());
            format!("{}", derived.get())
        });
        runtime.flush();
        assert_eq!(runtime.text(id).as_deref(), Some("2"));

        atom.set(3);
        runtime.flush();
        let handles = handles.borrow();
        assert!(handles.len() >= 2, "expected a re-render after the write");
        assert_eq!(handles[0].get(), 3, "old handle must see the new value");
    }
}
