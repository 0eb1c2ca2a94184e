//! Namespaced response cache backed by snapshot storage

pub mod store;

pub use store::PersistentCacheStore;
