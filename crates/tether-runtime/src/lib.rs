#![forbid(unsafe_code)]

//! Hook-driven component runtime for Tether.
//!
//! Components are render functions producing text output. The runtime
//! drives them through distinct phases:
//!
//! ```text
//! render ──► pre-commit snapshot checks ──► commit ──► effects
//!    ▲                                                   │
//!    └────────────── re-render requests ◄────────────────┘
//! ```
//!
//! Per-instance persistent state lives in hook slots addressed by call
//! order ([`Scope::use_slot`]); post-commit side effects with keyed re-run
//! and cleanup in effect slots ([`Scope::use_effect`]). Re-renders are
//! requested through a [`RenderMarker`](scope::RenderMarker), a counter
//! the runtime treats as a state change, and processed from the
//! scheduler's microtask queue, never re-entrantly.
//!
//! [`Scope::use_external`] is the tear-free external-snapshot primitive:
//! a snapshot read during render is re-checked before commit and after
//! subscription registration, and a mismatch re-renders before anything
//! becomes observable.

pub mod reactive;
pub mod runtime;
pub mod scope;

pub use reactive::{Derived, Signal};
pub use runtime::{ComponentId, Runtime, STABILIZE_CAP};
pub use scope::{RedrawHandle, RenderMarker, Scope};
