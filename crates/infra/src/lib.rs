//! # Satchel Infrastructure
//!
//! Infrastructure implementations of core engine ports.
//!
//! This crate contains:
//! - File-backed snapshot storage and the persistent cache store
//! - The persisted offline action queue
//! - The reqwest-backed network gateway
//! - The strategy router and the sync engine with its trigger worker
//! - Connectivity monitoring, metrics, and configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `satchel-core`
//! - Depends on `satchel-domain` and `satchel-core`
//! - Contains all "impure" code (I/O, network, clocks)

pub mod cache;
pub mod config;
pub mod errors;
pub mod http;
pub mod net;
pub mod observability;
pub mod queue;
pub mod router;
pub mod storage;
pub mod sync;

// Re-export commonly used items
pub use cache::PersistentCacheStore;
pub use errors::InfraError;
pub use http::HttpGateway;
pub use net::ConnectivityMonitor;
pub use observability::EngineMetrics;
pub use queue::PersistedActionQueue;
pub use router::{StrategyRouter, StrategyRouterConfig};
pub use storage::SnapshotStore;
pub use sync::{SyncEngine, SyncOutcome, SyncWorker, SyncWorkerConfig};
