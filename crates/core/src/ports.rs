//! Port interfaces for engine operations
//!
//! Infrastructure adapters implement these; the engine and router only
//! ever see the traits.

use async_trait::async_trait;
use satchel_domain::{
    CachedResponse, CollectionDocument, DeadLetteredAction, EngineEvent, OfflineAction,
    RemoteResponse, RequestDescriptor, Result,
};
use serde_json::Value;

/// Namespaced key→response storage with bounded collection support.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Idempotent overwrite of one entry.
    async fn write(&self, namespace: &str, key: &str, entry: CachedResponse) -> Result<()>;

    /// Look up one entry.
    async fn read(&self, namespace: &str, key: &str) -> Result<Option<CachedResponse>>;

    /// Merge items into a bounded collection entry: dedup by identifier,
    /// incoming wins and lands at the front, truncate to `capacity`.
    /// Returns the merged document.
    async fn merge_collection(
        &self,
        collection_key: &str,
        incoming: Vec<Value>,
        capacity: usize,
    ) -> Result<CollectionDocument>;

    /// The current items of a collection; empty when absent.
    async fn collection_items(&self, collection_key: &str) -> Result<Vec<Value>>;

    /// Drop every entry in one namespace, in memory and on disk.
    async fn clear(&self, namespace: &str) -> Result<()>;

    /// Drop every namespace.
    async fn clear_all(&self) -> Result<()>;

    /// Delete persisted namespaces whose version tag does not match the
    /// current one. Returns the names that were purged.
    async fn purge_stale_namespaces(&self) -> Result<Vec<String>>;
}

/// Ordered, persisted FIFO of mutating actions awaiting replay.
#[async_trait]
pub trait ActionQueue: Send + Sync {
    /// Append to the tail and persist. Returns the new queue length.
    async fn enqueue(&self, action: OfflineAction) -> Result<usize>;

    /// Atomically remove and return the full current contents. Actions
    /// enqueued after this call belong to the next pass.
    async fn dequeue_all(&self) -> Result<Vec<OfflineAction>>;

    /// Re-append a failed action to the tail, preserving its id and
    /// capture time, and persist.
    async fn requeue(&self, action: OfflineAction) -> Result<()>;

    /// Retire an action that exhausted its replay budget.
    async fn dead_letter(&self, action: OfflineAction, reason: &str) -> Result<()>;

    /// Pending action count.
    async fn size(&self) -> Result<usize>;

    /// Retired actions, for inspection.
    async fn dead_letters(&self) -> Result<Vec<DeadLetteredAction>>;

    /// Drop all pending actions and retired dead letters, and persist the
    /// empty queue. Backs the full cache wipe.
    async fn clear(&self) -> Result<()>;
}

/// The network seam: executes a request and returns whatever the remote
/// answered. Transport failures (offline, timeout) come back as errors;
/// any HTTP status is an `Ok`.
#[async_trait]
pub trait NetworkGateway: Send + Sync {
    async fn execute(&self, request: &RequestDescriptor) -> Result<RemoteResponse>;
}

/// Where the engine publishes client-bound events. Delivery is
/// best-effort; publishing never fails and never blocks.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EngineEvent);
}
