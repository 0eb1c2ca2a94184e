//! Durable snapshot storage

pub mod snapshot;

pub use snapshot::SnapshotStore;
