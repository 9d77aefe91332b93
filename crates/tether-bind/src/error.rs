#![forbid(unsafe_code)]

//! Binding usage errors.
//!
//! Only misuse the binding can detect locally lives here. Everything else
//! (a selector panicking, a store's `get`/`listen` panicking) propagates
//! untouched to the runtime's own reporting; the binding installs no catch
//! and performs no retries.

use thiserror::Error;

use tether_store::{BindRejection, Store};

/// Errors detectable before a binding touches store data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// A store template was passed where a store instance belongs.
    #[error(transparent)]
    TemplateNotResolved(#[from] BindRejection),
}

/// Pre-flight probe: verify that `store` can be bound directly.
///
/// The hook entry points call this and panic on rejection (fail loudly,
/// early, with the instructive message); non-panicking callers can use it
/// to validate ahead of time.
pub fn ensure_bindable<S: Store>(store: &S) -> Result<(), BindError> {
    store.bindable().map_err(BindError::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
