//! Persistent namespaced cache
//!
//! In-memory maps front a [`SnapshotStore`] file per namespace. Reads are
//! served from memory; every mutation rewrites the namespace snapshot so a
//! restart picks up where the last process stopped. Snapshot keys carry the
//! cache schema version tag, which is what makes stale-version purging a
//! plain filename comparison.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use satchel_core::{merge_items, CacheStore};
use satchel_domain::config::CacheConfig;
use satchel_domain::constants::{NS_COLLECTIONS, QUEUE_SNAPSHOT_KEY};
use satchel_domain::{CachedResponse, CollectionDocument, Result, SatchelError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::storage::SnapshotStore;

/// One cached entry as it appears inside a namespace snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    key: String,
    response: CachedResponse,
}

/// Persisted form of a response namespace. Records are stored oldest first
/// so insertion order survives a reload.
#[derive(Debug, Serialize, Deserialize)]
struct NamespaceSnapshot {
    saved_at: DateTime<Utc>,
    records: Vec<CacheRecord>,
}

/// Persisted form of the collection map.
#[derive(Debug, Serialize, Deserialize)]
struct CollectionsSnapshot {
    saved_at: DateTime<Utc>,
    collections: BTreeMap<String, CollectionDocument>,
}

/// In-memory response namespace with insertion order for eviction.
#[derive(Debug, Default)]
struct Namespace {
    entries: HashMap<String, CachedResponse>,
    order: Vec<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    namespaces: HashMap<String, Namespace>,
    collections: BTreeMap<String, CollectionDocument>,
}

/// [`CacheStore`] adapter over [`SnapshotStore`] files.
///
/// Response namespaces are bounded: once a namespace holds
/// `namespace_entry_cap` entries, writing a new key drops the oldest one.
/// Storage failures degrade to memory-only operation with a warning; a
/// cache that cannot persist still has to serve.
#[derive(Debug)]
pub struct PersistentCacheStore {
    state: RwLock<CacheState>,
    snapshots: SnapshotStore,
    version_tag: String,
    entry_cap: usize,
}

impl PersistentCacheStore {
    /// Open the store and restore every namespace persisted under the
    /// current version tag. Unreadable snapshots are skipped, not fatal.
    pub async fn open(snapshots: SnapshotStore, config: &CacheConfig) -> Self {
        let store = Self {
            state: RwLock::new(CacheState::default()),
            snapshots,
            version_tag: config.version_tag.clone(),
            entry_cap: config.namespace_entry_cap,
        };
        store.restore().await;
        store
    }

    fn version_prefix(&self) -> String {
        format!("{}.", self.version_tag)
    }

    fn file_key(&self, namespace: &str) -> String {
        format!("{}.{}", self.version_tag, namespace)
    }

    async fn restore(&self) {
        let keys = match self.snapshots.list_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "cache restore skipped, snapshot listing failed");
                return;
            }
        };

        let prefix = self.version_prefix();
        let mut state = self.state.write().await;
        for key in keys {
            let Some(namespace) = key.strip_prefix(&prefix) else {
                continue;
            };

            if namespace == NS_COLLECTIONS {
                match self.snapshots.load::<CollectionsSnapshot>(&key).await {
                    Ok(Some(snapshot)) => {
                        debug!(collections = snapshot.collections.len(), "restored collection map");
                        state.collections = snapshot.collections;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(key = %key, error = %err, "skipping unreadable collections snapshot");
                    }
                }
            } else {
                match self.snapshots.load::<NamespaceSnapshot>(&key).await {
                    Ok(Some(snapshot)) => {
                        let mut ns = Namespace::default();
                        for record in snapshot.records {
                            ns.order.push(record.key.clone());
                            ns.entries.insert(record.key, record.response);
                        }
                        debug!(namespace, entries = ns.entries.len(), "restored cache namespace");
                        state.namespaces.insert(namespace.to_string(), ns);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(key = %key, error = %err, "skipping unreadable cache snapshot");
                    }
                }
            }
        }
    }

    async fn persist_namespace(&self, namespace: &str, ns: &Namespace) {
        let records = ns
            .order
            .iter()
            .filter_map(|key| {
                ns.entries
                    .get(key)
                    .map(|response| CacheRecord { key: key.clone(), response: response.clone() })
            })
            .collect();
        let snapshot = NamespaceSnapshot { saved_at: Utc::now(), records };

        if let Err(err) = self.snapshots.save(&self.file_key(namespace), &snapshot).await {
            warn!(namespace, error = %err, "cache namespace not persisted, serving from memory");
        }
    }

    async fn persist_collections(&self, collections: &BTreeMap<String, CollectionDocument>) {
        let snapshot =
            CollectionsSnapshot { saved_at: Utc::now(), collections: collections.clone() };

        if let Err(err) = self.snapshots.save(&self.file_key(NS_COLLECTIONS), &snapshot).await {
            warn!(error = %err, "collection map not persisted, serving from memory");
        }
    }

    fn reserved_namespace(namespace: &str) -> SatchelError {
        SatchelError::InvalidInput(format!(
            "namespace '{namespace}' is reserved for collection documents"
        ))
    }
}

#[async_trait]
impl CacheStore for PersistentCacheStore {
    async fn write(&self, namespace: &str, key: &str, entry: CachedResponse) -> Result<()> {
        if namespace == NS_COLLECTIONS {
            return Err(Self::reserved_namespace(namespace));
        }

        let mut state = self.state.write().await;
        let ns = state.namespaces.entry(namespace.to_string()).or_default();

        // Evict oldest entries before inserting a new key at capacity. A
        // restored namespace can start oversized when the cap was lowered
        // between runs, so this drains rather than dropping a single entry.
        if !ns.entries.contains_key(key) {
            while ns.entries.len() >= self.entry_cap {
                let Some(oldest) = ns.order.first().cloned() else { break };
                ns.entries.remove(&oldest);
                ns.order.retain(|k| k != &oldest);
                debug!(namespace, evicted = %oldest, "namespace at capacity, dropped oldest entry");
            }
        }

        ns.entries.insert(key.to_string(), entry);
        ns.order.retain(|k| k != key);
        ns.order.push(key.to_string());

        self.persist_namespace(namespace, ns).await;
        Ok(())
    }

    async fn read(&self, namespace: &str, key: &str) -> Result<Option<CachedResponse>> {
        if namespace == NS_COLLECTIONS {
            return Err(Self::reserved_namespace(namespace));
        }

        let state = self.state.read().await;
        Ok(state.namespaces.get(namespace).and_then(|ns| ns.entries.get(key)).cloned())
    }

    async fn merge_collection(
        &self,
        collection_key: &str,
        incoming: Vec<Value>,
        capacity: usize,
    ) -> Result<CollectionDocument> {
        let mut state = self.state.write().await;
        let existing = state
            .collections
            .get(collection_key)
            .map(|doc| doc.items.clone())
            .unwrap_or_default();

        let items = merge_items(&existing, &incoming, capacity);
        let doc = CollectionDocument { items, last_updated: Utc::now(), capacity };
        state.collections.insert(collection_key.to_string(), doc.clone());

        self.persist_collections(&state.collections).await;
        Ok(doc)
    }

    async fn collection_items(&self, collection_key: &str) -> Result<Vec<Value>> {
        let state = self.state.read().await;
        Ok(state.collections.get(collection_key).map(|doc| doc.items.clone()).unwrap_or_default())
    }

    async fn clear(&self, namespace: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if namespace == NS_COLLECTIONS {
            state.collections.clear();
        } else {
            state.namespaces.remove(namespace);
        }

        if let Err(err) = self.snapshots.delete(&self.file_key(namespace)).await {
            warn!(namespace, error = %err, "cache snapshot not deleted");
        }
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.namespaces.clear();
        state.collections.clear();

        match self.snapshots.list_keys().await {
            Ok(keys) => {
                let prefix = self.version_prefix();
                for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
                    if let Err(err) = self.snapshots.delete(key).await {
                        warn!(key = %key, error = %err, "cache snapshot not deleted");
                    }
                }
            }
            Err(err) => warn!(error = %err, "snapshot listing failed during cache clear"),
        }
        Ok(())
    }

    async fn purge_stale_namespaces(&self) -> Result<Vec<String>> {
        let prefix = self.version_prefix();
        let keys = self.snapshots.list_keys().await?;

        let mut purged = Vec::new();
        for key in keys {
            // The offline queue shares the directory and is deliberately
            // unversioned: queued user actions survive schema upgrades.
            if key == QUEUE_SNAPSHOT_KEY || key.starts_with(&prefix) {
                continue;
            }
            match self.snapshots.delete(&key).await {
                Ok(_) => {
                    info!(key = %key, "purged stale cache snapshot");
                    purged.push(key);
                }
                Err(err) => warn!(key = %key, error = %err, "stale cache snapshot not deleted"),
            }
        }
        Ok(purged)
    }
}
