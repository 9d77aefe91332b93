#![forbid(unsafe_code)]

//! Shared listener registry and mount lifecycle for all store types.
//!
//! A [`Hub`] owns everything about a store except its value: the listener
//! table (plain and key-filtered), the mount callbacks with their pending
//! cleanups, and the delayed-teardown timer. [`Atom`](crate::Atom) and
//! [`MapStore`](crate::MapStore) both embed one.
//!
//! # State machine
//!
//! ```text
//! UNMOUNTED --first listen / first get--> MOUNTED
//! MOUNTED   --last unlisten------------> MOUNTED (teardown armed)
//! armed     --new listen---------------> MOUNTED (teardown cancelled)
//! armed     --STORE_UNMOUNT_DELAY------> UNMOUNTED (cleanups run)
//! ```
//!
//! # Invariants
//!
//! 1. No internal borrow is held while a listener, mount callback, or
//!    cleanup runs (callbacks are snapshotted first), so callbacks may
//!    mutate the store or the listener table re-entrantly.
//! 2. A `get`-triggered mount with zero listeners arms the teardown timer
//!    immediately, so a read alone cannot keep a store mounted forever.
//! 3. Teardown runs cleanups in registration order, exactly once per
//!    mounted period.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tether_core::{ChangeCallback, Cleanup, Scheduler, Subscription, TaskHandle};
use tracing::trace;

use crate::{STORE_UNMOUNT_DELAY, StoreId};

/// Mount callback: runs on mount, may return a teardown closure.
pub(crate) type MountInit = Box<dyn FnMut() -> Option<Cleanup>>;

struct ListenerEntry<K> {
    id: u64,
    /// `None` listens to every change; `Some` only to the listed keys.
    keys: Option<SmallVec<[K; 4]>>,
    callback: Rc<RefCell<ChangeCallback>>,
}

pub(crate) struct Hub<K> {
    id: StoreId,
    this: Weak<Hub<K>>,
    scheduler: Scheduler,
    next_listener: Cell<u64>,
    listeners: RefCell<Vec<ListenerEntry<K>>>,
    mounted: Cell<bool>,
    inits: RefCell<Vec<Rc<RefCell<MountInit>>>>,
    cleanups: RefCell<Vec<Cleanup>>,
    teardown: RefCell<Option<TaskHandle>>,
}

impl<K: Clone + PartialEq + 'static> Hub<K> {
    pub(crate) fn new(id: StoreId, scheduler: Scheduler) -> Rc<Self> {
        Rc::new_cyclic(|this| Hub {
            id,
            this: this.clone(),
            scheduler,
            next_listener: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            mounted: Cell::new(false),
            inits: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            teardown: RefCell::new(None),
        })
    }

    pub(crate) fn store_id(&self) -> StoreId {
        self.id
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// Register a listener, mounting the store on the first one.
    pub(crate) fn subscribe(
        &self,
        keys: Option<SmallVec<[K; 4]>>,
        callback: ChangeCallback,
    ) -> Subscription {
        self.cancel_teardown();
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push(ListenerEntry {
            id,
            keys,
            callback: Rc::new(RefCell::new(callback)),
        });
        if !self.mounted.get() {
            self.mount();
        }
        let weak = self.this.clone();
        Subscription::new(move || {
            if let Some(hub) = weak.upgrade() {
                hub.remove_listener(id);
            }
        })
    }

    /// Mount on first read: a `get` on an unmounted store runs the mount
    /// callbacks so the returned snapshot reflects them, then arms the
    /// teardown timer if nothing is listening.
    pub(crate) fn ensure_mounted(&self) {
        if self.mounted.get() {
            return;
        }
        self.mount();
        if self.listeners.borrow().is_empty() {
            self.schedule_teardown();
        }
    }

    /// Register a mount callback. Runs immediately when the store is
    /// already mounted.
    pub(crate) fn on_mount(&self, init: MountInit) {
        let init = Rc::new(RefCell::new(init));
        self.inits.borrow_mut().push(Rc::clone(&init));
        if self.mounted.get() {
            let cleanup = (init.borrow_mut())();
            if let Some(cleanup) = cleanup {
                self.cleanups.borrow_mut().push(cleanup);
            }
        }
    }

    /// Notify listeners. `changed = None` means the whole value changed
    /// (every listener fires); `Some(keys)` fires plain listeners plus
    /// keyed listeners whose filter intersects `keys`.
    pub(crate) fn notify(&self, changed: Option<&[K]>) {
        let targets: Vec<Rc<RefCell<ChangeCallback>>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| match (&entry.keys, changed) {
                (None, _) | (_, None) => true,
                (Some(filter), Some(changed)) => changed.iter().any(|key| filter.contains(key)),
            })
            .map(|entry| Rc::clone(&entry.callback))
            .collect();
        for callback in targets {
            (callback.borrow_mut())();
        }
    }

    fn mount(&self) {
        self.mounted.set(true);
        self.cancel_teardown();
        trace!(store = %self.id, "store mounted");
        let inits: Vec<Rc<RefCell<MountInit>>> = self.inits.borrow().iter().map(Rc::clone).collect();
        for init in inits {
            let cleanup = (init.borrow_mut())();
            if let Some(cleanup) = cleanup {
                self.cleanups.borrow_mut().push(cleanup);
            }
        }
    }

    fn remove_listener(&self, id: u64) {
        let now_empty = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|entry| entry.id != id);
            listeners.is_empty()
        };
        if now_empty && self.mounted.get() {
            self.schedule_teardown();
        }
    }

    fn schedule_teardown(&self) {
        self.cancel_teardown();
        trace!(store = %self.id, delay_ms = STORE_UNMOUNT_DELAY.as_millis() as u64, "teardown armed");
        let weak = self.this.clone();
        let handle = self.scheduler.defer_after(STORE_UNMOUNT_DELAY, move || {
            if let Some(hub) = weak.upgrade() {
                hub.teardown_if_idle();
            }
        });
        *self.teardown.borrow_mut() = Some(handle);
    }

    fn cancel_teardown(&self) {
        if let Some(handle) = self.teardown.borrow_mut().take() {
            handle.cancel();
        }
    }

    fn teardown_if_idle(&self) {
        if !self.mounted.get() || !self.listeners.borrow().is_empty() {
            return;
        }
        self.mounted.set(false);
        trace!(store = %self.id, "store torn down");
        let cleanups: Vec<Cleanup> = self.cleanups.borrow_mut().drain(..).collect();
        for cleanup in cleanups {
            cleanup();
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> (Rc<Hub<&'static str>>, Scheduler) {
        let scheduler = Scheduler::new();
        (Hub::new(StoreId::next(), scheduler.clone()), scheduler)
    }

    #[test]
    fn first_listener_mounts() {
        let (hub, _scheduler) = hub();
        let mounts = Rc::new(Cell::new(0));
        let m = Rc::clone(&mounts);
        hub.on_mount(Box::new(move || {
            m.set(m.get() + 1);
            None
        }));
        assert!(!hub.is_mounted());

        let _sub = hub.subscribe(None, Box::new(|| {}));
        assert!(hub.is_mounted());
        assert_eq!(mounts.get(), 1);

        let _sub2 = hub.subscribe(None, Box::new(|| {}));
        assert_eq!(mounts.get(), 1, "second listener must not remount");
    }

    #[test]
    fn teardown_waits_for_delay() {
        let (hub, scheduler) = hub();
        let destroyed = Rc::new(Cell::new(0));
        let d = Rc::clone(&destroyed);
        hub.on_mount(Box::new(move || {
            let d = Rc::clone(&d);
            Some(Box::new(move || d.set(d.get() + 1)) as Cleanup)
        }));

        let sub = hub.subscribe(None, Box::new(|| {}));
        drop(sub);
        assert_eq!(destroyed.get(), 0);

        scheduler.advance(STORE_UNMOUNT_DELAY / 2);
        assert_eq!(destroyed.get(), 0, "grace period not yet elapsed");

        scheduler.advance(STORE_UNMOUNT_DELAY);
        assert_eq!(destroyed.get(), 1);
        assert!(!hub.is_mounted());
    }

    #[test]
    fn relisten_within_delay_cancels_teardown() {
        let (hub, scheduler) = hub();
        let destroyed = Rc::new(Cell::new(0));
        let d = Rc::clone(&destroyed);
        hub.on_mount(Box::new(move || {
            let d = Rc::clone(&d);
            Some(Box::new(move || d.set(d.get() + 1)) as Cleanup)
        }));

        let sub = hub.subscribe(None, Box::new(|| {}));
        drop(sub);
        scheduler.advance(STORE_UNMOUNT_DELAY / 2);

        let _sub2 = hub.subscribe(None, Box::new(|| {}));
        scheduler.advance(STORE_UNMOUNT_DELAY * 2);
        assert_eq!(destroyed.get(), 0, "remount within delay must cancel teardown");
        assert!(hub.is_mounted());
    }

    #[test]
    fn read_mount_arms_teardown() {
        let (hub, scheduler) = hub();
        let mounts = Rc::new(Cell::new(0));
        let m = Rc::clone(&mounts);
        hub.on_mount(Box::new(move || {
            m.set(m.get() + 1);
            None
        }));

        hub.ensure_mounted();
        assert_eq!(mounts.get(), 1);
        assert_eq!(scheduler.timer_count(), 1, "idle mounted store must arm teardown");

        scheduler.advance(STORE_UNMOUNT_DELAY);
        assert!(!hub.is_mounted());
    }

    #[test]
    fn on_mount_after_mount_runs_immediately() {
        let (hub, _scheduler) = hub();
        let _sub = hub.subscribe(None, Box::new(|| {}));
        let ran = Rc::new(Cell::new(false));
        let r = Rc::clone(&ran);
        hub.on_mount(Box::new(move || {
            r.set(true);
            None
        }));
        assert!(ran.get());
    }

    #[test]
    fn keyed_filtering() {
        let (hub, _scheduler) = hub();
        let plain = Rc::new(Cell::new(0));
        let keyed = Rc::new(Cell::new(0));
        let p = Rc::clone(&plain);
        let k = Rc::clone(&keyed);
        let _all = hub.subscribe(None, Box::new(move || p.set(p.get() + 1)));
        let _a_only = hub.subscribe(
            Some(SmallVec::from_slice(&["a"])),
            Box::new(move || k.set(k.get() + 1)),
        );

        hub.notify(Some(&["b"][..]));
        assert_eq!((plain.get(), keyed.get()), (1, 0));

        hub.notify(Some(&["a"][..]));
        assert_eq!((plain.get(), keyed.get()), (2, 1));

        hub.notify(None);
        assert_eq!((plain.get(), keyed.get()), (3, 2));
    }

    #[test]
    fn listener_may_resubscribe_during_notify() {
        let (hub, _scheduler) = hub();
        let hub2 = Rc::clone(&hub);
        let extra: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let e = Rc::clone(&extra);
        let _sub = hub.subscribe(
            None,
            Box::new(move || {
                *e.borrow_mut() = Some(hub2.subscribe(None, Box::new(|| {})));
            }),
        );
        hub.notify(None);
        assert_eq!(hub.listener_count(), 2);
    }
}
