#![forbid(unsafe_code)]

//! Reactive cells for composing derived values without re-subscribing to
//! raw sources.
//!
//! - [`Signal`]: a shared, version-tracked value cell with change
//!   notification via subscriber callbacks.
//! - [`Derived`]: a lazily-evaluated, memoized value computed from one or
//!   more signals; marked dirty on source change, recomputed on read.
//!
//! Both use `Rc` sharing on the single UI thread. Subscriber callbacks are
//! snapshotted before invocation, so a callback may read or write cells
//! re-entrantly.

pub mod derived;
pub mod signal;

pub use derived::Derived;
pub use signal::Signal;
