#![forbid(unsafe_code)]

//! Tether public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use tether_bind as bind;
    pub use tether_core as core;
    pub use tether_harness as harness;
    pub use tether_runtime as runtime;
    pub use tether_store as store;

    pub use tether_bind::{
        BindOptions, use_store, use_store_polling, use_store_signal, use_store_with,
    };
    pub use tether_runtime::{Runtime, Scope};
    pub use tether_store::{Atom, MapStore, MapTemplate, Store};
}
