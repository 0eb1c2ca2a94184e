//! Background synchronization of the offline action queue
//!
//! Two pieces cooperate here:
//! - `SyncEngine`: drains the queue and replays actions, one pass at a time
//! - `SyncWorker`: owns the schedule (periodic, connectivity-regained, and
//!   explicit triggers) with explicit lifecycle management, join handle
//!   tracking, and cancellation support

pub mod engine;
pub mod worker;

pub use engine::{SyncEngine, SyncOutcome};
pub use worker::{SyncWorker, SyncWorkerConfig};
