//! Snapshot persistence: the per-file store and its record codec.

mod record;
mod store;

pub use store::SnapshotStore;
