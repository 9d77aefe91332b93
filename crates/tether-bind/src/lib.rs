#![forbid(unsafe_code)]

//! Reactive store bindings: let a component observe a
//! [`Store`](tether_store::Store) and re-render exactly when the state it
//! cares about changes.
//!
//! The core is a small protocol. [`store_binding`] turns `(store, options)`
//! into a memoized `(subscribe, get_snapshot)` pair; a delivery strategy
//! ([`deliver::Deliver`]) adapts that pair onto the runtime:
//!
//! - [`use_store`] / [`use_store_with`]: primary entry, backed by the
//!   runtime's tear-free external-snapshot primitive.
//! - [`use_store_polling`]: coalesced polling fallback; notifications are
//!   debounced onto a single scheduler tick and produce at most one forced
//!   re-render per tick; a pre-effect baseline check reconciles
//!   render-phase writes.
//! - [`use_store_signal`]: wraps the live value in a
//!   [`Derived`](tether_runtime::Derived) cell for further reactive
//!   composition.
//!
//! Options restrict *what triggers* re-renders (`keys`, for keyed stores)
//! and *what is returned* (`selector`) independently: a selector narrows
//! the projected value, never the change sources.
//!
//! ```
//! use tether_bind::{BindOptions, use_store_with};
//! use tether_runtime::Runtime;
//! use tether_store::MapStore;
//!
//! let runtime = Runtime::new();
//! let profile: MapStore<&str, String> = MapStore::new();
//! profile.set_key("name", "Ada".into());
//!
//! let store = profile.clone();
//! let id = runtime.mount(move |scope| {
//!     let name = use_store_with(
//!         scope,
//!         &store,
//!         &BindOptions::new()
//!             .keys(["name"])
//!             .selector(|value| value.get("name").cloned().unwrap_or_default()),
//!     );
//!     format!("hello {name}")
//! });
//! runtime.flush();
//! assert_eq!(runtime.text(id).as_deref(), Some("hello Ada"));
//! ```

pub mod binding;
pub mod deliver;
pub mod error;
pub mod options;

use tether_runtime::{Derived, Scope};
use tether_store::Store;

pub use binding::{StoreBinding, store_binding};
pub use deliver::{COALESCING_TICK, Coalesced, Deliver, DerivedCell, TearFree};
pub use error::{BindError, ensure_bindable};
pub use options::BindOptions;

/// Bind a store and return its current value, re-rendering the calling
/// component on every change.
///
/// # Panics
///
/// Panics when `store` is a template that was never resolved to an
/// instance; see [`ensure_bindable`].
pub fn use_store<S>(scope: &mut Scope<'_>, store: &S) -> S::Value
where
    S: Store + Clone + 'static,
{
    use_store_with(scope, store, &BindOptions::new())
}

/// [`use_store`] with options: `keys` restricts which changes re-render,
/// `selector` narrows the returned value.
pub fn use_store_with<S, R>(scope: &mut Scope<'_>, store: &S, options: &BindOptions<S, R>) -> R
where
    S: Store + Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    bind_with::<TearFree, S, R>(scope, store, options)
}

/// Binding backed exclusively by the coalesced polling strategy, for
/// runtimes and tests that need the fallback explicitly.
pub fn use_store_polling<S, R>(scope: &mut Scope<'_>, store: &S, options: &BindOptions<S, R>) -> R
where
    S: Store + Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    bind_with::<Coalesced, S, R>(scope, store, options)
}

/// Binding that returns a stable [`Derived`] reactive value instead of a
/// plain snapshot.
pub fn use_store_signal<S, R>(
    scope: &mut Scope<'_>,
    store: &S,
    options: &BindOptions<S, R>,
) -> Derived<R>
where
    S: Store + Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    bind_with::<DerivedCell, S, R>(scope, store, options)
}

/// Strategy-generic entry: build the binding pair, then hand it to `D`.
pub fn bind_with<D, S, R>(
    scope: &mut Scope<'_>,
    store: &S,
    options: &BindOptions<S, R>,
) -> D::Output<R>
where
    D: Deliver,
    S: Store + Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    let binding = store_binding(scope, store, options);
    D::deliver(scope, binding)
}
