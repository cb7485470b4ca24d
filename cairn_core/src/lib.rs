//! Core cairn types and traits.
//!
//! This crate defines what the pinner, the garbage collector and the storage
//! backends share:
//!
//! - Block keys (`hash::Hash`) and the visit-once key set (`KeySet`)
//! - The DAG node block format (`node::DagNode`)
//! - Capability traits for the collaborators the core talks to:
//!   - `BlockStore` / `GcBlockstore`: content-addressed storage that can be
//!     enumerated, deleted from and locked for a GC run
//!   - `LinkResolver`: resolves a key to the keys it links to
//!   - `Datastore`: small key-value store for pin records
//!   - `PinRoots`: the roots a pinner protects
//! - `BlockDag`, an offline `LinkResolver` over any `BlockStore`
//!
//! Backends live in their own crates (`cairn_store_memory`,
//! `cairn_store_local`, `cairn_datastore_redb`), so alternative storage can
//! be plugged in without touching the pinner or GC logic.

pub mod datastore;
pub mod hash;
pub mod key_set;
pub mod links;
pub mod node;
pub mod pins;
pub mod store;

// Test utilities (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

pub use datastore::Datastore;
pub use hash::{Hash, ParseHashError};
pub use key_set::KeySet;
pub use links::{BlockDag, LinkError, LinkResolver};
pub use node::DagNode;
pub use pins::PinRoots;
pub use store::{
    BlockStore, GcBlockstore, GcGuard, GcLocker, KeyStream, PinGuard, StoreError, StoreResult,
};
