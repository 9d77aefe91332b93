#![forbid(unsafe_code)]

//! The binding core: `(store, options)` → memoized `(subscribe, snapshot)`
//! pair.
//!
//! `subscribe` is cached in a hook slot keyed by `(StoreId, keys token)`
//! and compared by value across renders, so a component re-subscribes only
//! when the store or the key filter actually changed, never because a
//! render recreated an options value. `get_snapshot` is rebuilt each
//! render from the current selector: selectors carry no identity in Rust,
//! and rebuilding the cheap closure means a swapped selector is picked up
//! without forcing a re-subscription.

use std::rc::Rc;

use tracing::trace;

use tether_core::{ChangeCallback, Subscription};
use tether_runtime::Scope;
use tether_store::{Store, StoreId};

use crate::error::ensure_bindable;
use crate::options::BindOptions;

type SubscribeFn = Rc<dyn Fn(ChangeCallback) -> Subscription>;

/// The memoized pair a delivery strategy consumes.
pub struct StoreBinding<R> {
    pub(crate) subscribe: SubscribeFn,
    pub(crate) get_snapshot: Rc<dyn Fn() -> R>,
    store_id: StoreId,
    keys_token: Option<String>,
}

impl<R> StoreBinding<R> {
    /// Register the binding's change callback with the store.
    pub fn subscribe(&self, on_change: ChangeCallback) -> Subscription {
        (self.subscribe)(on_change)
    }

    /// Current (selected) snapshot of the store.
    #[must_use]
    pub fn snapshot(&self) -> R {
        (self.get_snapshot)()
    }

    /// Token identifying `(store, key filter)`; strategies key their
    /// mount effects on it so a changed store or filter re-subscribes.
    #[must_use]
    pub fn identity(&self) -> String {
        match &self.keys_token {
            Some(token) => format!("{}[{token}]", self.store_id),
            None => format!("{}[*]", self.store_id),
        }
    }
}

impl<R> Clone for StoreBinding<R> {
    fn clone(&self) -> Self {
        Self {
            subscribe: Rc::clone(&self.subscribe),
            get_snapshot: Rc::clone(&self.get_snapshot),
            store_id: self.store_id,
            keys_token: self.keys_token.clone(),
        }
    }
}

struct SubscribeMemo {
    store_id: StoreId,
    keys_token: Option<String>,
    subscribe: SubscribeFn,
}

/// Build the binding pair for `(store, options)`.
///
/// No side effects beyond what the store's own listener registration
/// performs; errors from a broken store propagate from the delegated
/// calls.
///
/// # Panics
///
/// Panics with the store's rejection message when `store` is not directly
/// bindable (a template passed where an instance belongs).
pub fn store_binding<S, R>(
    scope: &mut Scope<'_>,
    store: &S,
    options: &BindOptions<S, R>,
) -> StoreBinding<R>
where
    S: Store + Clone + 'static,
    R: Clone + 'static,
{
    if let Err(error) = ensure_bindable(store) {
        panic!("{error}");
    }
    let keys_token = options.keys_token();

    let memo = scope.use_slot::<Option<SubscribeMemo>>(|| None);
    let cached = {
        let memo = memo.borrow();
        memo.as_ref()
            .filter(|m| m.store_id == store.id() && m.keys_token == keys_token)
            .map(|m| Rc::clone(&m.subscribe))
    };
    let subscribe = match cached {
        Some(subscribe) => subscribe,
        None => {
            let subscribe: SubscribeFn = match &options.keys {
                Some(keys) => {
                    let store = store.clone();
                    let keys = keys.clone();
                    Rc::new(move |on_change| store.listen_keys(&keys, on_change))
                }
                None => {
                    let store = store.clone();
                    Rc::new(move |on_change| store.listen(on_change))
                }
            };
            trace!(
                store = %store.id(),
                keys = keys_token.as_deref().unwrap_or("*"),
                "subscribe function (re)built"
            );
            *memo.borrow_mut() = Some(SubscribeMemo {
                store_id: store.id(),
                keys_token: keys_token.clone(),
                subscribe: Rc::clone(&subscribe),
            });
            subscribe
        }
    };

    let snapshot_store = store.clone();
    let selector = Rc::clone(&options.selector);
    let get_snapshot: Rc<dyn Fn() -> R> = Rc::new(move || {
        let value = snapshot_store.get();
        selector(&value)
    });

    StoreBinding {
        subscribe,
        get_snapshot,
        store_id: store.id(),
        keys_token,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
