#![forbid(unsafe_code)]

//! Keyed store: a mapping from keys to values with per-key change
//! notification.
//!
//! [`MapStore::set_key`] notifies plain listeners plus keyed listeners
//! whose filter contains the changed key. Whole-map [`MapStore::set`]
//! diffs old against new entries (inserts, removals, and changed values
//! all count) and fires keyed listeners whose filter intersects the
//! changed set, at most once per listener per mutation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;
use tether_core::{ChangeCallback, Cleanup, Scheduler, Subscription};

use crate::lifecycle::Hub;
use crate::{Store, StoreId, StoreKey};

/// Shared keyed store.
pub struct MapStore<K, V> {
    entries: Rc<RefCell<AHashMap<K, V>>>,
    hub: Rc<Hub<K>>,
}

impl<K: StoreKey, V: Clone + PartialEq + 'static> MapStore<K, V> {
    /// Create an empty keyed store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(AHashMap::new())),
            hub: Hub::new(StoreId::next(), Scheduler::current()),
        }
    }

    /// Create a store seeded with `entries`.
    pub fn from_entries(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let store = Self::new();
        *store.entries.borrow_mut() = entries.into_iter().collect();
        store
    }

    /// Write one key, notifying listeners interested in it. Writing an
    /// equal value is a no-op.
    pub fn set_key(&self, key: K, value: V) {
        let changed = {
            let mut entries = self.entries.borrow_mut();
            if entries.get(&key) == Some(&value) {
                false
            } else {
                entries.insert(key.clone(), value);
                true
            }
        };
        if changed {
            self.hub.notify(Some(std::slice::from_ref(&key)));
        }
    }

    /// Remove one key, notifying listeners interested in it. Removing an
    /// absent key is a no-op.
    pub fn remove_key(&self, key: &K) {
        let removed = self.entries.borrow_mut().remove(key).is_some();
        if removed {
            self.hub.notify(Some(std::slice::from_ref(key)));
        }
    }

    /// Replace the whole mapping, notifying per changed key.
    pub fn set(&self, new_entries: AHashMap<K, V>) {
        let changed: SmallVec<[K; 4]> = {
            let mut entries = self.entries.borrow_mut();
            let mut changed = SmallVec::new();
            for (key, value) in &new_entries {
                if entries.get(key) != Some(value) {
                    changed.push(key.clone());
                }
            }
            for key in entries.keys() {
                if !new_entries.contains_key(key) {
                    changed.push(key.clone());
                }
            }
            *entries = new_entries;
            changed
        };
        if !changed.is_empty() {
            self.hub.notify(Some(&changed[..]));
        }
    }

    /// Read a single key without touching the mount lifecycle.
    #[must_use]
    pub fn get_key(&self, key: &K) -> Option<V> {
        self.entries.borrow().get(key).cloned()
    }

    /// Register a mount callback; see [`Atom::on_mount`](crate::Atom::on_mount).
    pub fn on_mount(&self, mut init: impl FnMut() -> Option<Cleanup> + 'static) {
        self.hub.on_mount(Box::new(move || init()));
    }

    /// Whether the store is currently mounted.
    #[must_use]
    pub fn mounted(&self) -> bool {
        self.hub.is_mounted()
    }
}

impl<K: StoreKey, V: Clone + PartialEq + 'static> Store for MapStore<K, V> {
    type Value = AHashMap<K, V>;
    type Key = K;

    fn id(&self) -> StoreId {
        self.hub.store_id()
    }

    fn get(&self) -> AHashMap<K, V> {
        self.hub.ensure_mounted();
        self.entries.borrow().clone()
    }

    fn listen(&self, on_change: ChangeCallback) -> Subscription {
        self.hub.subscribe(None, on_change)
    }

    fn listen_keys(&self, keys: &[K], on_change: ChangeCallback) -> Subscription {
        self.hub
            .subscribe(Some(keys.iter().cloned().collect()), on_change)
    }
}

impl<K: StoreKey, V: Clone + PartialEq + 'static> Default for MapStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for MapStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            hub: Rc::clone(&self.hub),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MapStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapStore")
            .field("entries", &*self.entries.borrow())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
