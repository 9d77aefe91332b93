#![forbid(unsafe_code)]

//! Core substrate for Tether: the cooperative scheduler and the subscription
//! guard shared by the store, runtime, and binding crates.
//!
//! Everything here is single-threaded by design. Stores, components, and
//! bindings all live on one UI thread; mutation of their bookkeeping is
//! serialized by the render/effect phases, so no locks are needed anywhere
//! in the stack.

pub mod scheduler;
pub mod subscription;

pub use scheduler::{Scheduler, TaskHandle};
pub use subscription::{ChangeCallback, Cleanup, Subscription};
