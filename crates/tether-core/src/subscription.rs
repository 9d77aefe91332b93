#![forbid(unsafe_code)]

//! Change-callback registration primitives.
//!
//! A reactive subscription is "register a zero-argument change callback,
//! get back a disposer". [`Subscription`] is that disposer as an RAII
//! guard: dropping it releases the registration, and the `Option::take`
//! in `Drop` makes release-exactly-once structural rather than a
//! convention.

use std::fmt;

/// Zero-argument change notification callback.
///
/// Carries no payload: receivers re-read the current value through their
/// own snapshot function, so a late or coalesced delivery can never pin a
/// stale value.
pub type ChangeCallback = Box<dyn FnMut() + 'static>;

/// Boxed teardown closure, run at most once.
pub type Cleanup = Box<dyn FnOnce() + 'static>;

/// RAII guard for a listener registration.
///
/// The release closure runs exactly once: on drop, or earlier via
/// [`unsubscribe`](Self::unsubscribe), which consumes the guard. A released
/// guard cannot be released again by construction.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a release closure.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription that releases nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Release the registration now instead of at drop.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
