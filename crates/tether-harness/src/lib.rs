#![forbid(unsafe_code)]

//! Test harness for Tether: a deterministic driver for the runtime and
//! scheduler, plus small fixtures shared by the integration tests.
//!
//! [`TestBed`] owns handles to the thread's scheduler and a fresh runtime.
//! `mount`/`unmount`/`invalidate` flush immediately (the "act" discipline:
//! assertions always observe a settled tree), while timers (coalescing
//! windows, store unmount delays) fire only through [`TestBed::tick`] and
//! [`TestBed::advance`].

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;
use web_time::Duration;

use tether_runtime::{ComponentId, Runtime, Scope};
use tether_core::Scheduler;

/// Deterministic driver around a [`Runtime`] and its [`Scheduler`].
pub struct TestBed {
    runtime: Runtime,
    scheduler: Scheduler,
}

impl TestBed {
    /// Create a bed on the calling thread's scheduler.
    #[must_use]
    pub fn new() -> Self {
        let scheduler = Scheduler::current();
        Self {
            runtime: Runtime::new(),
            scheduler,
        }
    }

    /// The runtime under test.
    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The scheduler driving it.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mount a component and flush to its first committed render.
    pub fn mount(&self, component: impl Fn(&mut Scope<'_>) -> String + 'static) -> ComponentId {
        let id = self.runtime.mount(component);
        self.flush();
        id
    }

    /// Unmount a component and flush.
    pub fn unmount(&self, id: ComponentId) {
        self.runtime.unmount(id);
        self.flush();
    }

    /// Re-render a component as if its parent passed new props, and flush.
    pub fn invalidate(&self, id: ComponentId) {
        self.runtime.invalidate(id);
        self.flush();
    }

    /// Drain pending re-renders without firing timers.
    pub fn flush(&self) {
        self.scheduler.flush();
    }

    /// Let the event loop turn once: due timers fire, renders settle.
    pub fn tick(&self) {
        debug!("tick");
        self.scheduler.tick();
    }

    /// Advance virtual time, firing timers as they come due.
    pub fn advance(&self, delta: Duration) {
        debug!(ms = delta.as_millis() as u64, "advance");
        self.scheduler.advance(delta);
    }

    /// Committed output of a mounted component.
    ///
    /// # Panics
    ///
    /// Panics when `id` is not mounted; use [`try_text`](Self::try_text)
    /// to probe.
    #[must_use]
    pub fn text(&self, id: ComponentId) -> String {
        self.runtime
            .text(id)
            .unwrap_or_else(|| panic!("{id} is not mounted"))
    }

    /// Committed output, or `None` when unmounted.
    #[must_use]
    pub fn try_text(&self, id: ComponentId) -> Option<String> {
        self.runtime.text(id)
    }

    /// Render count of a mounted component.
    ///
    /// # Panics
    ///
    /// Panics when `id` is not mounted.
    #[must_use]
    pub fn renders(&self, id: ComponentId) -> u64 {
        self.runtime
            .renders(id)
            .unwrap_or_else(|| panic!("{id} is not mounted"))
    }
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared event log for asserting side-effect ordering (mount
/// constructors, destroys, notification arrival).
#[derive(Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    /// Snapshot of all events so far.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
