//! Message protocol between the engine and foreground clients
//!
//! Every message is a `{type, payload}` pair. Engine-bound requests either
//! mutate engine state or trigger a client-bound reply; client-bound events
//! are broadcast best-effort to every connected subscriber.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engine-bound messages sent by foreground clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineRequest {
    /// Merge items into a bounded collection cache
    CacheItems(CacheItemsPayload),
    /// Ask for the cached items of a collection; answered by `CachedItems`
    GetCachedItems(CollectionKeyPayload),
    /// Clear every cache namespace and the offline queue
    ClearCache,
    /// Enqueue a mutating action for later replay
    QueueAction(QueueActionPayload),
    /// Ask for connectivity and queue state; answered by `OfflineStatus`
    GetOfflineStatus,
}

/// Client-bound messages broadcast or replied by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    /// Reply to `GetCachedItems`
    CachedItems(CachedItemsPayload),
    /// A mutation was captured into the queue
    ActionQueued(ActionQueuedPayload),
    /// A queued mutation was successfully replayed
    ActionSynced(ActionSyncedPayload),
    /// Current connectivity and queue snapshot
    OfflineStatus(OfflineStatusPayload),
}

/// Items to merge into a collection cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheItemsPayload {
    pub collection_key: String,
    pub items: Vec<serde_json::Value>,
}

/// Names the collection a query targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionKeyPayload {
    pub collection_key: String,
}

/// Fields of an action to enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueActionPayload {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Cached items handed back for a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedItemsPayload {
    pub collection_key: String,
    pub items: Vec<serde_json::Value>,
}

/// Announcement that a mutation entered the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionQueuedPayload {
    pub action_id: Uuid,
    pub queue_length: usize,
}

/// Announcement that a queued mutation replayed successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSyncedPayload {
    pub action_id: Uuid,
}

/// Connectivity plus pending-action count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineStatusPayload {
    pub is_online: bool,
    pub queued_actions: usize,
}
