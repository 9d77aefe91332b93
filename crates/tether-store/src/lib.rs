#![forbid(unsafe_code)]

//! Mutable value stores with subscribe/get semantics, keyed change
//! notification, and a reference-counted mount lifecycle.
//!
//! A store is a shared, single-threaded value container. Consumers read a
//! [`Snapshot`](Store::get) at a point in time and register zero-argument
//! change callbacks via [`Store::listen`] (any change) or
//! [`Store::listen_keys`] (changes to specific keys of a keyed store).
//!
//! # Lifecycle
//!
//! Stores are lazy: side-effectful setup registered with `on_mount` runs
//! when the first listener attaches or when the value is first read, and
//! its teardown runs only after the last listener detaches *and* the
//! [`STORE_UNMOUNT_DELAY`] grace period elapses with no new listener. Two
//! temporally-close unmount/mount cycles therefore never churn the mount
//! side effects.
//!
//! # Invariants
//!
//! 1. Setting a value equal to the current value is a no-op (no
//!    notifications).
//! 2. Listeners are notified in registration order; notification never
//!    holds internal borrows, so callbacks may freely read, write, or
//!    re-subscribe.
//! 3. Mount setup runs at most once per mounted period; teardown runs
//!    exactly once per completed mounted period.
//! 4. Dropping a [`Subscription`] releases its registration before the next
//!    notification cycle.

pub mod atom;
pub mod map;
pub mod template;

mod lifecycle;

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use web_time::Duration;

pub use ahash::AHashMap;
pub use tether_core::{ChangeCallback, Cleanup, Subscription};

pub use atom::Atom;
pub use map::MapStore;
pub use template::MapTemplate;

/// Grace period between the last unsubscribe and store teardown.
///
/// A new listener (or a lazy-mounting read) arriving within this window
/// cancels the pending teardown, so the mount side effects survive rapid
/// remounts.
pub const STORE_UNMOUNT_DELAY: Duration = Duration::from_millis(1000);

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a logical store.
///
/// Bindings memoize their subscriptions on `(StoreId, key filter)`; two
/// clones of the same store handle share one id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StoreId(u64);

impl StoreId {
    pub(crate) fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}", self.0)
    }
}

/// Key type of stores that have no per-key writes.
///
/// Uninhabited, so a non-empty key filter for an unkeyed store cannot be
/// constructed: the structural rendition of "keys are restricted to the
/// key type accepted by `set_key`".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Unkeyed {}

/// Bound alias for key types accepted by keyed stores.
pub trait StoreKey: Clone + Eq + Hash + fmt::Debug + 'static {}

impl<K: Clone + Eq + Hash + fmt::Debug + 'static> StoreKey for K {}

/// Rejection returned by [`Store::bindable`] for values that have a store
/// shape but cannot be bound directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "`{template}` is a store template, not a store instance: resolve it with \
     `.instance(id)` first and bind the resolved store"
)]
pub struct BindRejection {
    /// Name of the offending template.
    pub template: String,
}

/// The interface bindings consume.
///
/// `set`/`set_key` live on the concrete store types; a binding only ever
/// reads and listens.
pub trait Store {
    /// The stored value.
    type Value: Clone + PartialEq + 'static;
    /// Key type accepted by the store's per-key writes. [`Unkeyed`] for
    /// stores without them.
    type Key: StoreKey;

    /// Stable identity of this store across handle clones.
    fn id(&self) -> StoreId;

    /// Snapshot of the current value. Mounts the store if it is not
    /// mounted yet.
    fn get(&self) -> Self::Value;

    /// Register a callback fired on any change. Mounts the store on the
    /// first registration.
    fn listen(&self, on_change: ChangeCallback) -> Subscription;

    /// Register a callback fired only when one of `keys` changes.
    fn listen_keys(&self, keys: &[Self::Key], on_change: ChangeCallback) -> Subscription;

    /// Whether this value may be bound directly. Store instances say yes;
    /// templates reject with an instructive message.
    fn bindable(&self) -> Result<(), BindRejection> {
        Ok(())
    }
}
