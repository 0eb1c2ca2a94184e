//! Client-facing engine handle
//!
//! [`EngineHandle`] is what foreground code holds. Queries never error
//! across the client boundary: if the engine cannot answer within the
//! configured wait, the handle resolves to a safe default (an empty item
//! list, or an offline status with nothing queued).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use satchel_domain::{
    ActionQueuedPayload, CacheItemsPayload, CollectionKeyPayload, EngineEvent, EngineRequest,
    OfflineStatusPayload, QueueActionPayload, RequestDescriptor, Result, RoutedResponse,
    SatchelError,
};
use tokio::sync::broadcast;
use tracing::warn;

use crate::engine::Engine;

/// Await `operation` for at most `limit`; `None` on timeout.
async fn bounded<T>(limit: Duration, operation: impl Future<Output = T>) -> Option<T> {
    tokio::time::timeout(limit, operation).await.ok()
}

/// Cheaply cloneable client handle over a shared [`Engine`].
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<Engine>,
    query_timeout: Duration,
}

impl EngineHandle {
    pub fn new(engine: Arc<Engine>, query_timeout: Duration) -> Self {
        Self { engine, query_timeout }
    }

    /// Route one request through the engine's strategy table.
    pub async fn fetch(&self, request: RequestDescriptor) -> Result<RoutedResponse> {
        self.engine.fetch(request).await
    }

    /// Merge items into a bounded collection cache.
    pub async fn cache_items(
        &self,
        collection_key: &str,
        items: Vec<serde_json::Value>,
    ) -> Result<()> {
        let payload =
            CacheItemsPayload { collection_key: collection_key.to_string(), items };
        self.engine.handle_request(EngineRequest::CacheItems(payload)).await.map(|_| ())
    }

    /// Cached items for a collection; empty if the engine cannot answer in
    /// time.
    pub async fn cached_items(&self, collection_key: &str) -> Vec<serde_json::Value> {
        let request = EngineRequest::GetCachedItems(CollectionKeyPayload {
            collection_key: collection_key.to_string(),
        });
        match self.query(request).await {
            Some(EngineEvent::CachedItems(payload)) => payload.items,
            _ => Vec::new(),
        }
    }

    /// Connectivity and queue snapshot; assumed offline with an empty queue
    /// if the engine cannot answer in time.
    pub async fn offline_status(&self) -> OfflineStatusPayload {
        match self.query(EngineRequest::GetOfflineStatus).await {
            Some(EngineEvent::OfflineStatus(payload)) => payload,
            _ => OfflineStatusPayload { is_online: false, queued_actions: 0 },
        }
    }

    /// Capture a mutation for replay once the network allows it.
    pub async fn queue_action(&self, action: QueueActionPayload) -> Result<ActionQueuedPayload> {
        match self.engine.handle_request(EngineRequest::QueueAction(action)).await? {
            Some(EngineEvent::ActionQueued(payload)) => Ok(payload),
            _ => Err(SatchelError::Protocol("queued action was not acknowledged".to_string())),
        }
    }

    /// Wipe every cache namespace and the offline queue.
    pub async fn clear_cache(&self) -> Result<()> {
        self.engine.handle_request(EngineRequest::ClearCache).await.map(|_| ())
    }

    /// Ask for a replay pass outside the regular schedule.
    pub async fn request_sync(&self) {
        self.engine.request_sync().await;
    }

    /// Subscribe to engine events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.subscribe()
    }

    /// One bounded-wait query round trip. `None` means timeout or engine
    /// failure; callers substitute their defaults.
    async fn query(&self, request: EngineRequest) -> Option<EngineEvent> {
        match bounded(self.query_timeout, self.engine.handle_request(request)).await {
            Some(Ok(reply)) => reply,
            Some(Err(err)) => {
                warn!(error = %err, "engine query failed; falling back to defaults");
                None
            }
            None => {
                let timeout_ms = self.query_timeout.as_millis() as u64;
                warn!(timeout_ms, "engine query timed out; falling back to defaults");
                None
            }
        }
    }
}
