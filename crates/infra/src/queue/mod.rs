//! Persisted offline action queue

pub mod offline_queue;

pub use offline_queue::PersistedActionQueue;
