#![forbid(unsafe_code)]

//! Single-value store.
//!
//! An [`Atom`] holds one value and notifies every listener on any change.
//! Handles are cheap clones sharing the same value, listeners, and
//! lifecycle; identity follows the shared state, not the handle.
//!
//! ```
//! use tether_store::{Atom, Store};
//!
//! let counter = Atom::new(0);
//! let seen = std::rc::Rc::new(std::cell::Cell::new(0));
//! let s = std::rc::Rc::clone(&seen);
//! let _sub = counter.listen(Box::new(move || s.set(s.get() + 1)));
//!
//! counter.set(1);
//! counter.set(1); // equal value: no notification
//! assert_eq!(seen.get(), 1);
//! assert_eq!(counter.get(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tether_core::{ChangeCallback, Cleanup, Scheduler, Subscription};

use crate::lifecycle::Hub;
use crate::{Store, StoreId, Unkeyed};

/// Shared single-value store.
pub struct Atom<V> {
    value: Rc<RefCell<V>>,
    hub: Rc<Hub<Unkeyed>>,
}

impl<V: Clone + PartialEq + 'static> Atom<V> {
    /// Create a store holding `initial`, attached to the calling thread's
    /// scheduler for its unmount-delay timer.
    #[must_use]
    pub fn new(initial: V) -> Self {
        Self {
            value: Rc::new(RefCell::new(initial)),
            hub: Hub::new(StoreId::next(), Scheduler::current()),
        }
    }

    /// Replace the value, notifying listeners. Setting an equal value is a
    /// no-op.
    pub fn set(&self, value: V) {
        let changed = {
            let mut current = self.value.borrow_mut();
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            self.hub.notify(None);
        }
    }

    /// Register a mount callback: runs when the store mounts (first
    /// listener or first read), its returned closure on delayed teardown.
    /// Runs immediately if the store is already mounted.
    pub fn on_mount(&self, mut init: impl FnMut() -> Option<Cleanup> + 'static) {
        self.hub.on_mount(Box::new(move || init()));
    }

    /// Whether the store is currently mounted.
    #[must_use]
    pub fn mounted(&self) -> bool {
        self.hub.is_mounted()
    }
}

impl<V: Clone + PartialEq + 'static> Store for Atom<V> {
    type Value = V;
    type Key = Unkeyed;

    fn id(&self) -> StoreId {
        self.hub.store_id()
    }

    fn get(&self) -> V {
        self.hub.ensure_mounted();
        self.value.borrow().clone()
    }

    fn listen(&self, on_change: ChangeCallback) -> Subscription {
        self.hub.subscribe(None, on_change)
    }

    fn listen_keys(&self, _keys: &[Unkeyed], on_change: ChangeCallback) -> Subscription {
        // `Unkeyed` is uninhabited, so the filter is necessarily empty and
        // equivalent to listening for any change.
        self.hub.subscribe(None, on_change)
    }
}

impl<V> Clone for Atom<V> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            hub: Rc::clone(&self.hub),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Atom<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.hub.store_id())
            .field("value", &*self.value.borrow())
            .field("mounted", &self.hub.is_mounted())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
