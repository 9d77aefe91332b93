#![forbid(unsafe_code)]

//! Per-render hook surface handed to component render functions.
//!
//! Hook slots are addressed by call order, so the same hooks must run in
//! the same order on every render of a component (the usual hook rule).
//!
//! # Hooks
//!
//! - [`use_slot`](Scope::use_slot): persistent per-instance state.
//! - [`use_effect`](Scope::use_effect): post-commit side effect with a
//!   string key; re-runs (after cleaning up) only when the key changes.
//! - [`marker`](Scope::marker): force-update primitive.
//! - [`use_external`](Scope::use_external): tear-free external snapshot
//!   subscription.
//! - [`use_signal`](Scope::use_signal) / [`use_derived`](Scope::use_derived):
//!   stable reactive cells.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tether_core::{ChangeCallback, Cleanup, Subscription};

use crate::reactive::{Derived, Signal};
use crate::runtime::{ComponentCell, ComponentId, EffectSlot, Runtime, RuntimeInner};

/// Hook context for one render of one component instance.
pub struct Scope<'a> {
    runtime: Runtime,
    cell: &'a Rc<ComponentCell>,
    slot_cursor: usize,
    effect_cursor: usize,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(runtime: Runtime, cell: &'a Rc<ComponentCell>) -> Self {
        Self {
            runtime,
            cell,
            slot_cursor: 0,
            effect_cursor: 0,
        }
    }

    /// Persistent state slot. `init` runs only on the first render; later
    /// renders return the same cell.
    pub fn use_slot<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        let index = self.slot_cursor;
        self.slot_cursor += 1;
        let missing = self.cell.slots.borrow().len() == index;
        if missing {
            let slot: Rc<dyn Any> = Rc::new(RefCell::new(init()));
            self.cell.slots.borrow_mut().push(slot);
        }
        let slot = Rc::clone(&self.cell.slots.borrow()[index]);
        slot.downcast::<RefCell<T>>()
            .unwrap_or_else(|_| panic!("hook slot {index} changed type between renders"))
    }

    /// Post-commit effect. Runs after this render commits when `key`
    /// differs from the key it last ran with; the previous cleanup runs
    /// first. The cleanup also runs on unmount.
    pub fn use_effect(
        &mut self,
        key: impl Into<String>,
        effect: impl FnOnce() -> Option<Cleanup> + 'static,
    ) {
        let index = self.effect_cursor;
        self.effect_cursor += 1;
        let key = key.into();
        let mut effects = self.cell.effects.borrow_mut();
        if effects.len() == index {
            effects.push(EffectSlot {
                last_key: None,
                cleanup: None,
                pending: None,
            });
        }
        let slot = &mut effects[index];
        if slot.last_key.as_deref() != Some(key.as_str()) {
            slot.pending = Some((key, Box::new(effect)));
        } else {
            // Key matches what already ran; drop any pending re-run left
            // over from an intermediate render.
            slot.pending = None;
        }
    }

    /// Effect that runs once, after the first commit.
    pub fn use_effect_once(&mut self, effect: impl FnOnce() -> Option<Cleanup> + 'static) {
        self.use_effect("", effect);
    }

    /// Force-update primitive: a counter slot whose bump the runtime
    /// treats as a state change requiring re-render.
    pub fn marker(&mut self) -> RenderMarker {
        let count = self.use_slot(|| 0u64);
        RenderMarker {
            count,
            redraw: self.redraw_handle(),
        }
    }

    /// Handle that schedules a re-render of this component.
    #[must_use]
    pub fn redraw_handle(&self) -> RedrawHandle {
        RedrawHandle {
            inner: Rc::downgrade(&self.runtime.inner),
            id: self.cell.id,
        }
    }

    /// Tear-free external snapshot subscription.
    ///
    /// Returns `get_snapshot()` as of this render. The runtime re-checks
    /// the snapshot before commit and re-renders on drift; the mount
    /// effect (keyed by `identity`, so a new store or key filter
    /// re-subscribes) registers `subscribe` and immediately reconciles a
    /// write that landed between render and registration. Notifications
    /// re-render only when the snapshot value actually changed.
    pub fn use_external<R: Clone + PartialEq + 'static>(
        &mut self,
        subscribe: Rc<dyn Fn(ChangeCallback) -> Subscription>,
        get_snapshot: Rc<dyn Fn() -> R>,
        identity: impl Into<String>,
    ) -> R {
        let value = get_snapshot();
        let last = self.use_slot(|| value.clone());
        *last.borrow_mut() = value.clone();

        {
            let last = Rc::clone(&last);
            let gs = Rc::clone(&get_snapshot);
            self.cell
                .externals
                .borrow_mut()
                .push(Box::new(move || *last.borrow() != (gs)()));
        }

        let marker = self.marker();
        {
            let last = Rc::clone(&last);
            let gs = Rc::clone(&get_snapshot);
            let marker = marker.clone();
            self.use_effect(identity, move || {
                let notify_last = Rc::clone(&last);
                let notify_gs = Rc::clone(&gs);
                let notify_marker = marker.clone();
                let sub = subscribe(Box::new(move || {
                    if *notify_last.borrow() != (notify_gs)() {
                        notify_marker.bump();
                    }
                }));
                if *last.borrow() != (gs)() {
                    marker.bump();
                }
                Some(Box::new(move || drop(sub)) as Cleanup)
            });
        }
        value
    }

    /// Stable reactive cell, created on first render.
    pub fn use_signal<T: Clone + PartialEq + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Signal<T> {
        let slot = self.use_slot(|| Signal::new(init()));
        let signal = slot.borrow().clone();
        signal
    }

    /// Stable derived value, created on first render.
    pub fn use_derived<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> Derived<T>,
    ) -> Derived<T> {
        let slot = self.use_slot(init);
        let derived = slot.borrow().clone();
        derived
    }

    /// Identity of the component being rendered.
    #[must_use]
    pub fn component_id(&self) -> ComponentId {
        self.cell.id
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("component", &self.cell.id)
            .field("slot_cursor", &self.slot_cursor)
            .finish()
    }
}

/// Force-update marker: bumping it schedules a re-render. The rendered
/// value is never cached here; renders always re-read their snapshot.
#[derive(Clone)]
pub struct RenderMarker {
    count: Rc<RefCell<u64>>,
    redraw: RedrawHandle,
}

impl RenderMarker {
    /// Move the marker to a new identity and schedule a re-render.
    pub fn bump(&self) {
        *self.count.borrow_mut() += 1;
        self.redraw.request();
    }

    /// Current marker generation.
    #[must_use]
    pub fn value(&self) -> u64 {
        *self.count.borrow()
    }
}

impl fmt::Debug for RenderMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderMarker")
            .field("generation", &self.value())
            .finish()
    }
}

/// Weak handle scheduling re-renders for one component.
///
/// Requests against an unmounted component (or a dropped runtime) are
/// absorbed silently.
#[derive(Clone)]
pub struct RedrawHandle {
    inner: Weak<RuntimeInner>,
    id: ComponentId,
}

impl RedrawHandle {
    /// Schedule a re-render of the component.
    pub fn request(&self) {
        if let Some(inner) = self.inner.upgrade() {
            Runtime { inner }.mark_dirty(self.id);
        }
    }
}

impl fmt::Debug for RedrawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedrawHandle").field("id", &self.id).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
