#![forbid(unsafe_code)]

//! Shared value cell with change notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tether_core::Subscription;

type SubscriberFn<T> = Box<dyn FnMut(&T)>;

struct SignalInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    next_subscriber: Cell<u64>,
    subscribers: RefCell<Vec<(u64, Rc<RefCell<SubscriberFn<T>>>)>>,
}

/// A shared, version-tracked value cell.
///
/// Cloning shares the same cell. Setting an equal value is a no-op: no
/// version bump, no notifications.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Create a cell holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                next_subscriber: Cell::new(0),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value, notifying subscribers unless it is equal to the
    /// current one.
    pub fn set(&self, value: T) {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        };
        if !changed {
            return;
        }
        self.inner.version.set(self.inner.version.get() + 1);
        let subscribers: Vec<Rc<RefCell<SubscriberFn<T>>>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in subscribers {
            let value = self.inner.value.borrow().clone();
            (callback.borrow_mut())(&value);
        }
    }

    /// Register a subscriber, invoked with the new value after each change.
    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let id = self.inner.next_subscriber.get();
        self.inner.next_subscriber.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(Box::new(callback)))));
        let weak: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .subscribers
                    .borrow_mut()
                    .retain(|(other, _)| *other != id);
            }
        })
    }

    /// Monotonic change counter; bumps once per value-changing `set`.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
