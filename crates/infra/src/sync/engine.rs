//! Queued action replay
//!
//! [`SyncEngine::run_sync_pass`] drains the offline queue and replays each
//! action against the network in capture order. Successful replays are
//! announced and dropped; failures go back to the tail with backoff
//! bookkeeping; actions that exhaust their attempt budget are retired to
//! the dead-letter list. Passes are single-flight: a caller that finds a
//! pass already in progress gets [`SyncOutcome::AlreadyRunning`] instead
//! of a second drain.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use satchel_core::{ActionQueue, EventSink, NetworkGateway};
use satchel_domain::config::QueueConfig;
use satchel_domain::{ActionSyncedPayload, EngineEvent, Result, SatchelError};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::observability::EngineMetrics;

/// What one call to [`SyncEngine::run_sync_pass`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass ran to completion.
    Completed { synced: usize, requeued: usize, dead_lettered: usize },
    /// Another pass held the replay lock; nothing was drained.
    AlreadyRunning,
}

/// Replays queued offline actions in capture order.
pub struct SyncEngine {
    queue: Arc<dyn ActionQueue>,
    gateway: Arc<dyn NetworkGateway>,
    events: Arc<dyn EventSink>,
    metrics: Arc<EngineMetrics>,
    config: QueueConfig,
    pass_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<dyn ActionQueue>,
        gateway: Arc<dyn NetworkGateway>,
        events: Arc<dyn EventSink>,
        metrics: Arc<EngineMetrics>,
        config: QueueConfig,
    ) -> Self {
        Self { queue, gateway, events, metrics, config, pass_lock: Mutex::new(()) }
    }

    /// Run one replay pass over the queue.
    ///
    /// Actions whose backoff has not elapsed are requeued untouched; due
    /// actions are sent, and a failed send (transport error or a status
    /// outside the 2xx range) requeues the action with one more recorded
    /// attempt or retires it once the budget is spent. Re-filing errors do
    /// not abort the pass; they are collected and surfaced at the end so
    /// the remaining actions still get their replay.
    #[instrument(skip(self))]
    pub async fn run_sync_pass(&self) -> Result<SyncOutcome> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            debug!("replay pass already in flight");
            self.metrics.record_sync_pass_skipped();
            return Ok(SyncOutcome::AlreadyRunning);
        };

        let actions = self.queue.dequeue_all().await?;
        if actions.is_empty() {
            self.metrics.record_sync_pass();
            return Ok(SyncOutcome::Completed { synced: 0, requeued: 0, dead_lettered: 0 });
        }

        info!(count = actions.len(), "replaying queued actions");

        let base = Duration::from_secs(self.config.backoff_base_secs);
        let cap = Duration::from_secs(self.config.backoff_cap_secs);
        let now = Utc::now();
        let mut synced = 0_usize;
        let mut requeued = 0_usize;
        let mut dead_lettered = 0_usize;
        let mut refile_errors: Vec<String> = Vec::new();

        for mut action in actions {
            if !action.is_due(now) {
                match self.queue.requeue(action).await {
                    Ok(()) => requeued += 1,
                    Err(err) => refile_errors.push(err.to_string()),
                }
                continue;
            }

            let failure = match self.gateway.execute(&action.as_request()).await {
                Ok(response) if response.is_success() => {
                    debug!(action_id = %action.id, status = response.status, "action replayed");
                    self.events.publish(EngineEvent::ActionSynced(ActionSyncedPayload {
                        action_id: action.id,
                    }));
                    self.metrics.record_action_synced();
                    synced += 1;
                    None
                }
                Ok(response) => Some(format!("server rejected replay: status {}", response.status)),
                Err(err) => Some(err.to_string()),
            };

            let Some(reason) = failure else { continue };

            action.record_failure(base, cap);
            if action.has_exhausted(self.config.max_attempts) {
                warn!(
                    action_id = %action.id,
                    attempts = action.attempts,
                    reason = %reason,
                    "retiring action after exhausting replay attempts"
                );
                match self.queue.dead_letter(action, &reason).await {
                    Ok(()) => {
                        self.metrics.record_action_dead_lettered();
                        dead_lettered += 1;
                    }
                    Err(err) => refile_errors.push(err.to_string()),
                }
            } else {
                warn!(
                    action_id = %action.id,
                    attempts = action.attempts,
                    reason = %reason,
                    "replay failed; action requeued with backoff"
                );
                match self.queue.requeue(action).await {
                    Ok(()) => requeued += 1,
                    Err(err) => refile_errors.push(err.to_string()),
                }
            }
        }

        self.metrics.record_sync_pass();
        info!(synced, requeued, dead_lettered, "replay pass finished");

        if !refile_errors.is_empty() {
            return Err(SatchelError::Storage(refile_errors.join("; ")));
        }

        Ok(SyncOutcome::Completed { synced, requeued, dead_lettered })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for sync::engine.
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use satchel_domain::{OfflineAction, RemoteResponse, RequestDescriptor};
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use super::*;
    use crate::queue::PersistedActionQueue;
    use crate::storage::SnapshotStore;

    /// Gateway double returning scripted responses in order, recording the
    /// url of every request it saw.
    struct ScriptedGateway {
        responses: Mutex<VecDeque<Result<RemoteResponse>>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn new(responses: Vec<Result<RemoteResponse>>) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses.into()), seen: Mutex::new(Vec::new()) })
        }

        fn urls(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NetworkGateway for ScriptedGateway {
        async fn execute(&self, request: &RequestDescriptor) -> Result<RemoteResponse> {
            self.seen.lock().unwrap().push(request.url.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SatchelError::Network("no scripted response".to_string())))
        }
    }

    /// Gateway double that parks inside `execute` until released.
    struct BlockingGateway {
        entered: Notify,
        release: Notify,
    }

    impl BlockingGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self { entered: Notify::new(), release: Notify::new() })
        }
    }

    #[async_trait]
    impl NetworkGateway for BlockingGateway {
        async fn execute(&self, _request: &RequestDescriptor) -> Result<RemoteResponse> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(RemoteResponse { status: 200, headers: BTreeMap::new(), body: Vec::new() })
        }
    }

    /// Event sink double recording everything published.
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<EngineEvent>>,
    }

    impl RecordingSink {
        fn synced_ids(&self) -> Vec<uuid::Uuid> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    EngineEvent::ActionSynced(p) => Some(p.action_id),
                    _ => None,
                })
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn publish(&self, event: EngineEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Fixture {
        engine: Arc<SyncEngine>,
        queue: Arc<PersistedActionQueue>,
        gateway: Arc<ScriptedGateway>,
        sink: Arc<RecordingSink>,
        metrics: Arc<EngineMetrics>,
        _dir: TempDir,
    }

    async fn fixture(responses: Vec<Result<RemoteResponse>>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(PersistedActionQueue::open(SnapshotStore::new(dir.path())).await);
        let gateway = ScriptedGateway::new(responses);
        let sink = Arc::new(RecordingSink::default());
        let metrics = Arc::new(EngineMetrics::new());

        let engine = Arc::new(SyncEngine::new(
            queue.clone() as Arc<dyn ActionQueue>,
            gateway.clone() as Arc<dyn NetworkGateway>,
            sink.clone() as Arc<dyn EventSink>,
            metrics.clone(),
            QueueConfig::default(),
        ));

        Fixture { engine, queue, gateway, sink, metrics, _dir: dir }
    }

    fn ok(status: u16) -> Result<RemoteResponse> {
        Ok(RemoteResponse { status, headers: BTreeMap::new(), body: Vec::new() })
    }

    fn transport_error() -> Result<RemoteResponse> {
        Err(SatchelError::Network("connection refused".to_string()))
    }

    fn post(url: &str) -> OfflineAction {
        OfflineAction::new("POST", url, BTreeMap::new(), Some("{}".to_string()))
    }

    /// Validates `SyncEngine::run_sync_pass` behavior for a queue of
    /// replayable actions.
    ///
    /// Assertions:
    /// - Confirms actions are sent in capture order.
    /// - Confirms a synced event is published per action, in order.
    /// - Confirms the queue is empty after the pass.
    #[tokio::test]
    async fn test_pass_replays_actions_in_capture_order() {
        let fx = fixture(vec![ok(200), ok(201), ok(204)]).await;
        let (a, b, c) = (post("/api/messages/1"), post("/api/messages/2"), post("/api/messages/3"));
        let ids = vec![a.id, b.id, c.id];
        for action in [a, b, c] {
            fx.queue.enqueue(action).await.unwrap();
        }

        let outcome = fx.engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Completed { synced: 3, requeued: 0, dead_lettered: 0 });
        assert_eq!(
            fx.gateway.urls(),
            vec!["/api/messages/1", "/api/messages/2", "/api/messages/3"]
        );
        assert_eq!(fx.sink.synced_ids(), ids);
        assert_eq!(fx.queue.size().await.unwrap(), 0);
        assert_eq!(fx.metrics.snapshot().sync_passes, 1);
        assert_eq!(fx.metrics.snapshot().actions_synced, 3);
    }

    /// Validates `SyncEngine::run_sync_pass` behavior when the network is
    /// unreachable.
    ///
    /// Assertions:
    /// - Confirms the failed action returns to the queue with one recorded
    ///   attempt and a backoff window.
    /// - Confirms no synced event is published.
    #[tokio::test]
    async fn test_transport_failure_requeues_with_backoff() {
        let fx = fixture(vec![transport_error()]).await;
        let action = post("/api/messages/send");
        let id = action.id;
        fx.queue.enqueue(action).await.unwrap();

        let outcome = fx.engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Completed { synced: 0, requeued: 1, dead_lettered: 0 });
        assert!(fx.sink.synced_ids().is_empty());

        let requeued = fx.queue.dequeue_all().await.unwrap();
        assert_eq!(requeued.len(), 1);
        assert_eq!(requeued[0].id, id);
        assert_eq!(requeued[0].attempts, 1);
        assert!(!requeued[0].is_due(Utc::now()));
    }

    /// Validates `SyncEngine::run_sync_pass` behavior for a server that
    /// rejects the replay.
    ///
    /// Assertions:
    /// - Confirms a non-2xx status is treated like a failed send.
    #[tokio::test]
    async fn test_rejected_status_counts_as_failure() {
        let fx = fixture(vec![ok(500)]).await;
        fx.queue.enqueue(post("/api/messages/send")).await.unwrap();

        let outcome = fx.engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Completed { synced: 0, requeued: 1, dead_lettered: 0 });
        let requeued = fx.queue.dequeue_all().await.unwrap();
        assert_eq!(requeued[0].attempts, 1);
        assert!(fx.sink.synced_ids().is_empty());
    }

    /// Validates `SyncEngine::run_sync_pass` behavior for an action out of
    /// attempts.
    ///
    /// Assertions:
    /// - Confirms the action is retired to the dead-letter list instead of
    ///   the queue, with the failure reason attached.
    #[tokio::test]
    async fn test_exhausted_action_moves_to_dead_letters() {
        let fx = fixture(vec![transport_error()]).await;
        let mut action = post("/api/messages/send");
        let id = action.id;
        action.attempts = QueueConfig::default().max_attempts - 1;
        fx.queue.enqueue(action).await.unwrap();

        let outcome = fx.engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Completed { synced: 0, requeued: 0, dead_lettered: 1 });
        assert_eq!(fx.queue.size().await.unwrap(), 0);

        let retired = fx.queue.dead_letters().await.unwrap();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].action.id, id);
        assert!(retired[0].reason.contains("connection refused"));
        assert_eq!(fx.metrics.snapshot().actions_dead_lettered, 1);
    }

    /// Validates `SyncEngine::run_sync_pass` behavior for an action whose
    /// backoff has not elapsed.
    ///
    /// Assertions:
    /// - Confirms the action is requeued without a network attempt.
    /// - Confirms its attempt count and schedule are untouched.
    #[tokio::test]
    async fn test_not_due_action_requeued_untouched() {
        let fx = fixture(vec![ok(200)]).await;
        let mut action = post("/api/messages/send");
        let scheduled = Utc::now() + chrono::Duration::hours(1);
        action.next_attempt_at = Some(scheduled);
        fx.queue.enqueue(action).await.unwrap();

        let outcome = fx.engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Completed { synced: 0, requeued: 1, dead_lettered: 0 });
        assert_eq!(fx.gateway.calls(), 0);

        let requeued = fx.queue.dequeue_all().await.unwrap();
        assert_eq!(requeued[0].attempts, 0);
        assert_eq!(requeued[0].next_attempt_at, Some(scheduled));
    }

    /// Validates `SyncEngine::run_sync_pass` behavior for a mixed queue.
    ///
    /// Assertions:
    /// - Confirms a failure in the middle does not stop later actions from
    ///   replaying.
    /// - Confirms only the failed action returns to the queue.
    #[tokio::test]
    async fn test_mid_pass_failure_does_not_block_later_actions() {
        let fx = fixture(vec![ok(200), transport_error(), ok(200)]).await;
        let (a, b, c) = (post("/api/a"), post("/api/b"), post("/api/c"));
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        for action in [a, b, c] {
            fx.queue.enqueue(action).await.unwrap();
        }

        let outcome = fx.engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Completed { synced: 2, requeued: 1, dead_lettered: 0 });
        assert_eq!(fx.sink.synced_ids(), vec![a_id, c_id]);

        let remaining = fx.queue.dequeue_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b_id);
    }

    /// Validates `SyncEngine::run_sync_pass` behavior for an empty queue.
    ///
    /// Assertions:
    /// - Confirms the pass completes with zero counts and no network calls.
    #[tokio::test]
    async fn test_empty_queue_pass_completes() {
        let fx = fixture(Vec::new()).await;

        let outcome = fx.engine.run_sync_pass().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Completed { synced: 0, requeued: 0, dead_lettered: 0 });
        assert_eq!(fx.gateway.calls(), 0);
        assert_eq!(fx.metrics.snapshot().sync_passes, 1);
    }

    /// Validates `SyncEngine::run_sync_pass` single-flight behavior.
    ///
    /// Assertions:
    /// - Confirms a pass started while another is mid-replay reports
    ///   `AlreadyRunning` without draining the queue.
    /// - Confirms the first pass still completes normally.
    #[tokio::test]
    async fn test_overlapping_passes_are_single_flight() {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(PersistedActionQueue::open(SnapshotStore::new(dir.path())).await);
        let gateway = BlockingGateway::new();
        let sink = Arc::new(RecordingSink::default());
        let metrics = Arc::new(EngineMetrics::new());
        let engine = Arc::new(SyncEngine::new(
            queue.clone() as Arc<dyn ActionQueue>,
            gateway.clone() as Arc<dyn NetworkGateway>,
            sink.clone() as Arc<dyn EventSink>,
            metrics.clone(),
            QueueConfig::default(),
        ));

        queue.enqueue(post("/api/messages/send")).await.unwrap();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_sync_pass().await })
        };
        gateway.entered.notified().await;

        let overlapping = engine.run_sync_pass().await.unwrap();
        assert_eq!(overlapping, SyncOutcome::AlreadyRunning);
        assert_eq!(metrics.snapshot().sync_passes_skipped, 1);

        gateway.release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, SyncOutcome::Completed { synced: 1, requeued: 0, dead_lettered: 0 });
        assert_eq!(metrics.snapshot().sync_passes, 1);
    }
}
