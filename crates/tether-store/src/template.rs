#![forbid(unsafe_code)]

//! Store templates: factories producing one keyed store per instance id.
//!
//! A template is *not* a store, but it has a store's shape so that binding
//! one is expressible, and rejected. [`Store::bindable`] returns the
//! rejection, which bindings surface before touching any data method; the
//! data methods themselves fail loudly with the same message if called
//! directly.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tether_core::{ChangeCallback, Subscription};

use crate::map::MapStore;
use crate::{BindRejection, Store, StoreId, StoreKey};

/// Factory producing one [`MapStore`] per instance id, with per-instance
/// initialization. Resolved instances are cached: the same id always
/// yields the same store.
pub struct MapTemplate<K, V> {
    id: StoreId,
    name: String,
    init: Rc<dyn Fn(&MapStore<K, V>, &str)>,
    instances: Rc<RefCell<AHashMap<String, MapStore<K, V>>>>,
}

impl<K: StoreKey, V: Clone + PartialEq + 'static> MapTemplate<K, V> {
    /// Create a template. `init` runs once per new instance, receiving the
    /// fresh store and the instance id.
    pub fn new(name: impl Into<String>, init: impl Fn(&MapStore<K, V>, &str) + 'static) -> Self {
        Self {
            id: StoreId::next(),
            name: name.into(),
            init: Rc::new(init),
            instances: Rc::new(RefCell::new(AHashMap::new())),
        }
    }

    /// Resolve the store for `instance_id`, creating and initializing it on
    /// first use.
    pub fn instance(&self, instance_id: &str) -> MapStore<K, V> {
        let existing = self.instances.borrow().get(instance_id).cloned();
        if let Some(store) = existing {
            return store;
        }
        let store = MapStore::new();
        (self.init)(&store, instance_id);
        self.instances
            .borrow_mut()
            .insert(instance_id.to_string(), store.clone());
        store
    }

    /// The template's name, used in rejection messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn rejection(&self) -> BindRejection {
        BindRejection {
            template: self.name.clone(),
        }
    }
}

impl<K: StoreKey, V: Clone + PartialEq + 'static> Store for MapTemplate<K, V> {
    type Value = AHashMap<K, V>;
    type Key = K;

    fn id(&self) -> StoreId {
        self.id
    }

    fn get(&self) -> AHashMap<K, V> {
        panic!("{}", self.rejection());
    }

    fn listen(&self, _on_change: ChangeCallback) -> Subscription {
        panic!("{}", self.rejection());
    }

    fn listen_keys(&self, _keys: &[K], _on_change: ChangeCallback) -> Subscription {
        panic!("{}", self.rejection());
    }

    fn bindable(&self) -> Result<(), BindRejection> {
        Err(self.rejection())
    }
}

impl<K, V> Clone for MapTemplate<K, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            init: Rc::clone(&self.init),
            instances: Rc::clone(&self.instances),
        }
    }
}

impl<K, V> fmt::Debug for MapTemplate<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapTemplate")
            .field("name", &self.name)
            .field("instances", &self.instances.borrow().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
