//! Observability for the offline engine
//!
//! Counters for the events worth watching in production: cache
//! effectiveness, degraded serving, and replay outcomes. Plain atomics,
//! no locking.

pub mod metrics;

pub use metrics::{EngineMetrics, EngineMetricsSnapshot};
