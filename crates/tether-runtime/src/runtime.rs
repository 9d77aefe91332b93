#![forbid(unsafe_code)]

//! The runtime loop: mount, flush, unmount.
//!
//! # Flush discipline
//!
//! All rendering happens inside [`Runtime::flush_dirty`], which runs from
//! the scheduler's microtask queue. One flush pass renders every dirty
//! component in mount order, runs the pre-commit snapshot checks, and
//! only when no check reports a change commits and runs effects. A
//! failed check loops back to render *before* effects, so a torn snapshot
//! is never observable. Effects may mark components dirty again (forced
//! updates, store writes); the loop continues until quiescent, bounded by
//! [`STABILIZE_CAP`].
//!
//! # Invariants
//!
//! 1. Renders, commits, and effects happen in mount order within a pass.
//! 2. A component is never rendered re-entrantly: notification callbacks
//!    only enqueue work.
//! 3. `unmount` runs effect cleanups in declaration order and is a no-op
//!    on an already-unmounted id.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tether_core::{Cleanup, Scheduler};
use tracing::trace;

use crate::scope::Scope;

/// Upper bound on consecutive render passes in one flush.
///
/// A component whose render or effects keep requesting re-renders without
/// converging (e.g. unconditionally writing a bound store during render)
/// hits this cap and panics instead of looping forever.
pub const STABILIZE_CAP: usize = 64;

/// Identity of a mounted component instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ComponentId(u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

pub(crate) type RenderFn = Rc<dyn Fn(&mut Scope<'_>) -> String>;
pub(crate) type EffectFn = Box<dyn FnOnce() -> Option<Cleanup>>;

pub(crate) struct EffectSlot {
    pub(crate) last_key: Option<String>,
    pub(crate) cleanup: Option<Cleanup>,
    pub(crate) pending: Option<(String, EffectFn)>,
}

pub(crate) struct ComponentCell {
    pub(crate) id: ComponentId,
    pub(crate) render: RenderFn,
    pub(crate) slots: RefCell<Vec<Rc<dyn Any>>>,
    pub(crate) effects: RefCell<Vec<EffectSlot>>,
    /// Pre-commit snapshot checks registered by `use_external` during the
    /// latest render; each returns true when its snapshot has drifted.
    pub(crate) externals: RefCell<Vec<Box<dyn Fn() -> bool>>>,
    pub(crate) output: RefCell<String>,
    pub(crate) renders: Cell<u64>,
    pub(crate) alive: Cell<bool>,
}

pub(crate) struct RuntimeInner {
    pub(crate) scheduler: Scheduler,
    next_component: Cell<u64>,
    components: RefCell<AHashMap<ComponentId, Rc<ComponentCell>>>,
    order: RefCell<Vec<ComponentId>>,
    dirty: RefCell<Vec<ComponentId>>,
    flush_scheduled: Cell<bool>,
    flushing: Cell<bool>,
}

/// Shared handle to the runtime. Cheap to clone.
pub struct Runtime {
    pub(crate) inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime driven by the calling thread's scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                scheduler: Scheduler::current(),
                next_component: Cell::new(1),
                components: RefCell::new(AHashMap::new()),
                order: RefCell::new(Vec::new()),
                dirty: RefCell::new(Vec::new()),
                flush_scheduled: Cell::new(false),
                flushing: Cell::new(false),
            }),
        }
    }

    /// The scheduler driving this runtime.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        self.inner.scheduler.clone()
    }

    /// Mount a component. It renders on the next flush.
    pub fn mount(&self, component: impl Fn(&mut Scope<'_>) -> String + 'static) -> ComponentId {
        let id = ComponentId(self.inner.next_component.get());
        self.inner.next_component.set(id.0 + 1);
        let cell = Rc::new(ComponentCell {
            id,
            render: Rc::new(component),
            slots: RefCell::new(Vec::new()),
            effects: RefCell::new(Vec::new()),
            externals: RefCell::new(Vec::new()),
            output: RefCell::new(String::new()),
            renders: Cell::new(0),
            alive: Cell::new(true),
        });
        self.inner.components.borrow_mut().insert(id, cell);
        self.inner.order.borrow_mut().push(id);
        trace!(component = %id, "mounted");
        self.mark_dirty(id);
        id
    }

    /// Unmount a component, running its effect cleanups in declaration
    /// order. Unmounting an unknown or already-unmounted id is a no-op.
    pub fn unmount(&self, id: ComponentId) {
        let cell = self.inner.components.borrow_mut().remove(&id);
        self.inner.order.borrow_mut().retain(|other| *other != id);
        self.inner.dirty.borrow_mut().retain(|other| *other != id);
        let Some(cell) = cell else { return };
        cell.alive.set(false);
        trace!(component = %id, "unmounted");
        let cleanups: Vec<Cleanup> = cell
            .effects
            .borrow_mut()
            .iter_mut()
            .filter_map(|slot| slot.cleanup.take())
            .collect();
        for cleanup in cleanups {
            cleanup();
        }
    }

    /// Request a re-render from outside the component (the moral
    /// equivalent of a parent passing new props).
    pub fn invalidate(&self, id: ComponentId) {
        self.mark_dirty(id);
    }

    /// Drain the scheduler's microtask queue, processing every pending
    /// re-render ("flush before paint").
    pub fn flush(&self) {
        self.inner.scheduler.flush();
    }

    /// Latest committed output of a component.
    #[must_use]
    pub fn text(&self, id: ComponentId) -> Option<String> {
        self.cell(id).map(|cell| cell.output.borrow().clone())
    }

    /// How many times a component has rendered.
    #[must_use]
    pub fn renders(&self, id: ComponentId) -> Option<u64> {
        self.cell(id).map(|cell| cell.renders.get())
    }

    pub(crate) fn cell(&self, id: ComponentId) -> Option<Rc<ComponentCell>> {
        self.inner.components.borrow().get(&id).cloned()
    }

    pub(crate) fn mark_dirty(&self, id: ComponentId) {
        let known = self
            .cell(id)
            .map(|cell| cell.alive.get())
            .unwrap_or(false);
        if !known {
            return;
        }
        {
            let mut dirty = self.inner.dirty.borrow_mut();
            if !dirty.contains(&id) {
                dirty.push(id);
            }
        }
        self.schedule_flush();
    }

    fn schedule_flush(&self) {
        if self.inner.flush_scheduled.get() {
            return;
        }
        self.inner.flush_scheduled.set(true);
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.defer(move || {
            if let Some(inner) = weak.upgrade() {
                Runtime { inner }.flush_dirty();
            }
        });
    }

    fn flush_dirty(&self) {
        self.inner.flush_scheduled.set(false);
        if self.inner.flushing.get() {
            return;
        }
        self.inner.flushing.set(true);
        let mut passes = 0usize;
        loop {
            // Phase 1: render until the tree settles: no dirty components
            // and no pre-commit snapshot drift. A drifted component is
            // re-rendered before anything commits, so the drift is never
            // observable.
            let mut rendered: Vec<Rc<ComponentCell>> = Vec::new();
            loop {
                let batch = self.take_dirty_in_order();
                if batch.is_empty() {
                    break;
                }
                passes += 1;
                assert!(
                    passes <= STABILIZE_CAP,
                    "render loop failed to stabilize after {STABILIZE_CAP} passes"
                );
                for id in batch {
                    if let Some(cell) = self.cell(id) {
                        self.render_component(&cell);
                        if !rendered.iter().any(|other| other.id == cell.id) {
                            rendered.push(cell);
                        }
                    }
                }
                for cell in &rendered {
                    if !cell.alive.get() {
                        continue;
                    }
                    let drifted = cell.externals.borrow().iter().any(|check| check());
                    if drifted {
                        trace!(component = %cell.id, "snapshot drifted before commit");
                        self.mark_dirty(cell.id);
                    }
                }
            }
            if rendered.is_empty() {
                break;
            }
            // Phase 2: commit is now stable; run effects in mount order.
            // Effects may dirty components again (forced updates, store
            // writes), which the outer loop picks up.
            let order = self.inner.order.borrow().clone();
            rendered.sort_by_key(|cell| {
                order
                    .iter()
                    .position(|other| *other == cell.id)
                    .unwrap_or(usize::MAX)
            });
            for cell in &rendered {
                self.run_effects(cell);
            }
        }
        self.inner.flushing.set(false);
    }

    fn take_dirty_in_order(&self) -> Vec<ComponentId> {
        let mut batch: Vec<ComponentId> = self.inner.dirty.borrow_mut().drain(..).collect();
        let order = self.inner.order.borrow();
        batch.sort_by_key(|id| {
            order
                .iter()
                .position(|other| other == id)
                .unwrap_or(usize::MAX)
        });
        batch
    }

    fn render_component(&self, cell: &Rc<ComponentCell>) {
        if !cell.alive.get() {
            return;
        }
        cell.externals.borrow_mut().clear();
        let render = Rc::clone(&cell.render);
        let output = {
            let mut scope = Scope::new(self.clone(), cell);
            render(&mut scope)
        };
        *cell.output.borrow_mut() = output;
        cell.renders.set(cell.renders.get() + 1);
    }

    fn run_effects(&self, cell: &Rc<ComponentCell>) {
        if !cell.alive.get() {
            return;
        }
        let count = cell.effects.borrow().len();
        for index in 0..count {
            let work = {
                let mut effects = cell.effects.borrow_mut();
                let slot = &mut effects[index];
                slot.pending
                    .take()
                    .map(|(key, effect)| (key, effect, slot.cleanup.take()))
            };
            let Some((key, effect, old_cleanup)) = work else {
                continue;
            };
            if let Some(cleanup) = old_cleanup {
                cleanup();
            }
            let cleanup = effect();
            let mut effects = cell.effects.borrow_mut();
            let slot = &mut effects[index];
            slot.cleanup = cleanup;
            slot.last_key = Some(key);
        }
    }
}

impl Clone for Runtime {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("components", &self.inner.components.borrow().len())
            .field("dirty", &self.inner.dirty.borrow().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
