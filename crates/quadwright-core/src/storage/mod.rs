//! # Persistent Storage
//!
//! Disk-backed implementations of `QuadStore`.

mod redb_store;

pub use redb_store::RedbStore;
