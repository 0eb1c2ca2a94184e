//! Background worker driving replay passes.
//!
//! Owns the replay schedule: a periodic best-effort interval, a wakeup on
//! every offline-to-online transition, and an explicit trigger all funnel
//! into [`SyncEngine::run_sync_pass`]. Join handles are tracked,
//! cancellation is explicit, and stopping joins the task with a timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use satchel_infra::{ConnectivityMonitor, SyncEngine, SyncWorker, SyncWorkerConfig};
//!
//! # async fn example() -> Result<(), String> {
//! # let engine: Arc<SyncEngine> = todo!();
//! let connectivity = ConnectivityMonitor::new(true);
//! let mut worker = SyncWorker::new(engine, connectivity, SyncWorkerConfig::default());
//!
//! worker.start().await?;
//! // ... application runs ...
//! worker.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use satchel_domain::config::SyncConfig;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::net::ConnectivityMonitor;
use crate::sync::engine::{SyncEngine, SyncOutcome};

/// Configuration for the sync worker.
#[derive(Debug, Clone)]
pub struct SyncWorkerConfig {
    /// Interval between periodic passes
    pub interval: Duration,
    /// Whether the periodic schedule runs at all; connectivity wakeups and
    /// explicit triggers stay active either way
    pub periodic_enabled: bool,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(900),
            periodic_enabled: true,
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SyncConfig> for SyncWorkerConfig {
    fn from(sync: &SyncConfig) -> Self {
        Self {
            interval: Duration::from_secs(sync.interval_seconds),
            periodic_enabled: sync.enabled,
            ..Self::default()
        }
    }
}

/// Sync worker with explicit lifecycle management.
pub struct SyncWorker {
    engine: Arc<SyncEngine>,
    connectivity: ConnectivityMonitor,
    config: SyncWorkerConfig,
    trigger: Arc<Notify>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    /// Create a new worker over the given replay engine.
    pub fn new(
        engine: Arc<SyncEngine>,
        connectivity: ConnectivityMonitor,
        config: SyncWorkerConfig,
    ) -> Self {
        Self {
            engine,
            connectivity,
            config,
            trigger: Arc::new(Notify::new()),
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Start the worker, spawning the background schedule task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), String> {
        if self.is_running() {
            return Err("sync worker already running".to_string());
        }

        info!("starting sync worker");

        // A cancelled token cannot be reused after a previous stop
        self.cancellation = CancellationToken::new();

        let engine = Arc::clone(&self.engine);
        let online_rx = self.connectivity.subscribe();
        let trigger = Arc::clone(&self.trigger);
        let interval = self.config.interval;
        let periodic_enabled = self.config.periodic_enabled;
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::run_loop(engine, online_rx, trigger, interval, periodic_enabled, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("sync worker started");

        Ok(())
    }

    /// Stop the worker and wait for the schedule task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), String> {
        if !self.is_running() {
            return Err("sync worker not running".to_string());
        }

        info!("stopping sync worker");
        self.cancellation.cancel();

        // The schedule loop exits between passes, so the join normally
        // returns well inside the timeout.
        if let Some(handle) = self.task_handle.take() {
            let join_timeout = self.config.join_timeout;
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "sync worker task panicked");
                    return Err("sync worker task panicked".to_string());
                }
                Err(_) => {
                    warn!("sync worker did not stop inside the join timeout");
                    return Err("sync worker join timed out".to_string());
                }
            }
        }

        info!("sync worker stopped");
        self.cancellation = CancellationToken::new();

        Ok(())
    }

    /// Returns true when a worker instance is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Request a replay pass outside the schedule.
    ///
    /// Permits coalesce: triggering while a pass is pending or running
    /// results in at most one further pass.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Background schedule loop.
    async fn run_loop(
        engine: Arc<SyncEngine>,
        mut online_rx: watch::Receiver<bool>,
        trigger: Arc<Notify>,
        interval: Duration,
        periodic_enabled: bool,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("sync worker loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval), if periodic_enabled => {
                    Self::run_pass(&engine, "interval").await;
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        debug!("connectivity channel closed; stopping schedule");
                        break;
                    }
                    if *online_rx.borrow() {
                        info!("connectivity regained; replaying queued actions");
                        Self::run_pass(&engine, "connectivity").await;
                    } else {
                        debug!("connectivity lost");
                    }
                }
                _ = trigger.notified() => {
                    Self::run_pass(&engine, "explicit").await;
                }
            }
        }
    }

    /// Run one pass and log the outcome; the schedule never aborts on a
    /// failed pass.
    async fn run_pass(engine: &SyncEngine, reason: &'static str) {
        match engine.run_sync_pass().await {
            Ok(SyncOutcome::Completed { synced, requeued, dead_lettered }) => {
                debug!(reason, synced, requeued, dead_lettered, "replay pass finished");
            }
            Ok(SyncOutcome::AlreadyRunning) => {
                debug!(reason, "replay pass already in flight");
            }
            Err(err) => {
                warn!(reason, error = %err, "replay pass failed");
            }
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncWorker dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
