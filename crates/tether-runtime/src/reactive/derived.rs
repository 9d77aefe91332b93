#![forbid(unsafe_code)]

//! Lazily-evaluated values derived from [`Signal`] sources.
//!
//! A [`Derived`] caches its computed result and is marked dirty when a
//! source changes; the next [`get`](Derived::get) recomputes. Source
//! subscriptions hold only a `Weak` reference back to the derived state,
//! so dropping every handle releases it even while sources live on.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tether_core::Subscription;

use super::signal::Signal;

struct DerivedInner<T> {
    compute: Box<dyn Fn() -> T>,
    cached: RefCell<Option<T>>,
    dirty: Cell<bool>,
    /// Source subscriptions; never read, kept alive for the dirty wiring.
    _sources: RefCell<Vec<Subscription>>,
}

/// Read-only memoized value derived from signals.
///
/// Cloning shares the same cached state.
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T: Clone + 'static> Derived<T> {
    /// Derive from one signal.
    pub fn map<S: Clone + PartialEq + 'static>(
        source: &Signal<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self {
        let src = source.clone();
        let derived = Self::from_compute(Box::new(move || src.with(|value| map(value))));
        derived.watch(source);
        derived
    }

    /// Derive from two signals.
    pub fn map2<A, B>(a: &Signal<A>, b: &Signal<B>, map: impl Fn(&A, &B) -> T + 'static) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
    {
        let src_a = a.clone();
        let src_b = b.clone();
        let derived = Self::from_compute(Box::new(move || {
            src_a.with(|va| src_b.with(|vb| map(va, vb)))
        }));
        derived.watch(a);
        derived.watch(b);
        derived
    }

    fn from_compute(compute: Box<dyn Fn() -> T>) -> Self {
        Self {
            inner: Rc::new(DerivedInner {
                compute,
                cached: RefCell::new(None),
                dirty: Cell::new(true),
                _sources: RefCell::new(Vec::new()),
            }),
        }
    }

    fn watch<S: Clone + PartialEq + 'static>(&self, source: &Signal<S>) {
        let weak = Rc::downgrade(&self.inner);
        let sub = source.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.dirty.set(true);
            }
        });
        self.inner._sources.borrow_mut().push(sub);
    }

    /// Current value, recomputed first if any source changed.
    #[must_use]
    pub fn get(&self) -> T {
        let mut cached = self.inner.cached.borrow_mut();
        if self.inner.dirty.get() || cached.is_none() {
            *cached = Some((self.inner.compute)());
            self.inner.dirty.set(false);
        }
        cached
            .as_ref()
            .expect("cached is always Some after refresh")
            .clone()
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("cached", &*self.inner.cached.borrow())
            .field("dirty", &self.inner.dirty.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
