//! Domain types and models

pub mod action;
pub mod cache;
pub mod protocol;
pub mod request;

// Re-export the working set used across crates
pub use action::{DeadLetteredAction, OfflineAction, OfflineQueueSnapshot};
pub use cache::{CachedResponse, CollectionDocument};
pub use protocol::{
    ActionQueuedPayload, ActionSyncedPayload, CacheItemsPayload, CachedItemsPayload,
    CollectionKeyPayload, EngineEvent, EngineRequest, OfflineStatusPayload, QueueActionPayload,
};
pub use request::{RemoteResponse, RequestDescriptor, RoutedResponse};
