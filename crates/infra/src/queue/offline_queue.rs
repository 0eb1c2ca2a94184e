//! FIFO action queue mirrored to a snapshot file
//!
//! The in-memory deque is authoritative; after every mutation the whole
//! queue is rewritten to its snapshot file so captured actions survive a
//! restart. The snapshot key carries no cache version tag on purpose:
//! queued user work must outlive cache schema upgrades.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use satchel_core::ActionQueue;
use satchel_domain::constants::QUEUE_SNAPSHOT_KEY;
use satchel_domain::{DeadLetteredAction, OfflineAction, OfflineQueueSnapshot, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::storage::SnapshotStore;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<OfflineAction>,
    dead_letters: Vec<DeadLetteredAction>,
}

/// [`ActionQueue`] adapter persisted through [`SnapshotStore`].
///
/// Mutations hold the queue lock across the snapshot write, so the file
/// never lags memory by more than the write in flight. A failed write
/// degrades to memory-only operation with a warning.
#[derive(Debug)]
pub struct PersistedActionQueue {
    state: Mutex<QueueState>,
    snapshots: SnapshotStore,
}

impl PersistedActionQueue {
    /// Open the queue and restore the persisted snapshot if one exists.
    /// A missing or unreadable snapshot starts the queue empty.
    pub async fn open(snapshots: SnapshotStore) -> Self {
        let state = match snapshots.load::<OfflineQueueSnapshot>(QUEUE_SNAPSHOT_KEY).await {
            Ok(Some(snapshot)) => {
                info!(
                    pending = snapshot.actions.len(),
                    dead_letters = snapshot.dead_letters.len(),
                    "restored offline action queue"
                );
                QueueState { pending: snapshot.actions.into(), dead_letters: snapshot.dead_letters }
            }
            Ok(None) => QueueState::default(),
            Err(err) => {
                warn!(error = %err, "offline queue snapshot unreadable, starting empty");
                QueueState::default()
            }
        };

        Self { state: Mutex::new(state), snapshots }
    }

    async fn persist(&self, state: &QueueState) {
        let snapshot = OfflineQueueSnapshot::capture(
            state.pending.iter().cloned().collect(),
            state.dead_letters.clone(),
        );
        if let Err(err) = self.snapshots.save(QUEUE_SNAPSHOT_KEY, &snapshot).await {
            warn!(error = %err, "offline queue not persisted, holding in memory");
        }
    }
}

#[async_trait]
impl ActionQueue for PersistedActionQueue {
    #[instrument(skip(self, action), fields(action_id = %action.id, method = %action.method))]
    async fn enqueue(&self, action: OfflineAction) -> Result<usize> {
        let mut state = self.state.lock().await;
        state.pending.push_back(action);
        self.persist(&state).await;

        debug!(queue_length = state.pending.len(), "action enqueued");
        Ok(state.pending.len())
    }

    async fn dequeue_all(&self) -> Result<Vec<OfflineAction>> {
        let mut state = self.state.lock().await;
        let drained: Vec<OfflineAction> = state.pending.drain(..).collect();
        self.persist(&state).await;

        debug!(drained = drained.len(), "queue drained for replay");
        Ok(drained)
    }

    async fn requeue(&self, action: OfflineAction) -> Result<()> {
        let mut state = self.state.lock().await;
        state.pending.push_back(action);
        self.persist(&state).await;
        Ok(())
    }

    async fn dead_letter(&self, action: OfflineAction, reason: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.dead_letters.push(DeadLetteredAction {
            action,
            failed_at: Utc::now(),
            reason: reason.to_string(),
        });
        self.persist(&state).await;
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.pending.len())
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetteredAction>> {
        let state = self.state.lock().await;
        Ok(state.dead_letters.clone())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.pending.clear();
        state.dead_letters.clear();
        self.persist(&state).await;
        Ok(())
    }
}
