//! Engine counters
//!
//! ## Design
//! - **SeqCst ordering** for the counters that feed `hit_rate` (derived
//!   metric needs a consistent pair)
//! - **No locking needed**, simple atomic counters
//! - Recording never fails and never blocks a request path

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Counters covering the request router and the sync engine.
///
/// Shared via `Arc`; every record method takes `&self`.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Requests answered from cache (fresh hit or fallback)
    pub cache_hits: AtomicUsize,
    /// Requests that found nothing cached
    pub cache_misses: AtomicUsize,
    /// Responses served degraded: cache fallback or synthetic offline reply
    pub degraded_responses: AtomicUsize,
    /// Actions captured into the offline queue
    pub actions_queued: AtomicUsize,
    /// Actions replayed successfully
    pub actions_synced: AtomicUsize,
    /// Actions retired after exhausting their replay budget
    pub actions_dead_lettered: AtomicUsize,
    /// Replay passes that ran to completion
    pub sync_passes: AtomicUsize,
    /// Replay passes skipped because one was already running
    pub sync_passes_skipped: AtomicUsize,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineMetricsSnapshot {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub degraded_responses: usize,
    pub actions_queued: usize,
    pub actions_synced: usize,
    pub actions_dead_lettered: usize,
    pub sync_passes: usize,
    pub sync_passes_skipped: usize,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        // SeqCst for consistency with hit_rate calculation
        self.cache_hits.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_cache_miss(&self) {
        // SeqCst for consistency with hit_rate calculation
        self.cache_misses.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_degraded_response(&self) {
        self.degraded_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_queued(&self) {
        self.actions_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_synced(&self) {
        self.actions_synced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_dead_lettered(&self) {
        self.actions_dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync_pass(&self) {
        self.sync_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync_pass_skipped(&self) {
        self.sync_passes_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Cache hit rate as a percentage (0.0 to 100.0).
    ///
    /// Returns 0.0 when nothing has been recorded yet.
    pub fn hit_rate(&self) -> f64 {
        // SeqCst for a consistent snapshot of both counters
        let hits = self.cache_hits.load(Ordering::SeqCst);
        let misses = self.cache_misses.load(Ordering::SeqCst);

        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }

        (hits as f64 / total as f64) * 100.0
    }

    /// Copy every counter into a plain struct for logging or inspection.
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::SeqCst),
            cache_misses: self.cache_misses.load(Ordering::SeqCst),
            degraded_responses: self.degraded_responses.load(Ordering::Relaxed),
            actions_queued: self.actions_queued.load(Ordering::Relaxed),
            actions_synced: self.actions_synced.load(Ordering::Relaxed),
            actions_dead_lettered: self.actions_dead_lettered.load(Ordering::Relaxed),
            sync_passes: self.sync_passes.load(Ordering::Relaxed),
            sync_passes_skipped: self.sync_passes_skipped.load(Ordering::Relaxed),
        }
    }
}
