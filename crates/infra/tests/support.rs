//! Shared fixtures for infra integration tests.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use satchel_core::{ActionQueue, CacheStore, EventSink, NetworkGateway};
use satchel_domain::config::{CacheConfig, HttpConfig, QueueConfig, RouteConfig};
use satchel_domain::EngineEvent;
use satchel_infra::{
    ConnectivityMonitor, EngineMetrics, HttpGateway, PersistedActionQueue, PersistentCacheStore,
    SnapshotStore, StrategyRouter, StrategyRouterConfig, SyncEngine,
};
use tempfile::TempDir;
use uuid::Uuid;

/// Event sink recording every published event for later assertions.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }

    /// Ids announced by `ACTION_SYNCED` events, in publish order.
    pub fn synced_ids(&self) -> Vec<Uuid> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::ActionSynced(p) => Some(p.action_id),
                _ => None,
            })
            .collect()
    }

    /// Ids announced by `ACTION_QUEUED` events, in publish order.
    pub fn queued_ids(&self) -> Vec<Uuid> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::ActionQueued(p) => Some(p.action_id),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: EngineEvent) {
        self.events.lock().expect("sink mutex poisoned").push(event);
    }
}

/// A fully wired engine stack over a shared data directory, with its
/// gateway pointed at the given origin.
pub struct TestStack {
    pub cache: Arc<PersistentCacheStore>,
    pub queue: Arc<PersistedActionQueue>,
    pub connectivity: ConnectivityMonitor,
    pub metrics: Arc<EngineMetrics>,
    pub sink: Arc<CollectingSink>,
    pub router: StrategyRouter,
    pub engine: Arc<SyncEngine>,
}

/// Build a stack with real snapshot-backed stores under `dir`.
///
/// `background_refresh` is passed through to the router; tests that count
/// gateway calls should disable it.
pub async fn build_stack(dir: &TempDir, base_url: &str, background_refresh: bool) -> TestStack {
    let snapshots = SnapshotStore::new(dir.path());
    let cache =
        Arc::new(PersistentCacheStore::open(snapshots.clone(), &CacheConfig::default()).await);
    let queue = Arc::new(PersistedActionQueue::open(snapshots).await);

    let gateway = Arc::new(
        HttpGateway::from_config(&HttpConfig {
            base_url: Some(base_url.to_string()),
            timeout_secs: 5,
            max_attempts: 1,
            base_backoff_ms: 1,
        })
        .expect("gateway should build"),
    );

    let connectivity = ConnectivityMonitor::new(true);
    let metrics = Arc::new(EngineMetrics::new());
    let sink = Arc::new(CollectingSink::default());

    let router = StrategyRouter::new(
        StrategyRouterConfig { routes: RouteConfig::default(), background_refresh },
        gateway.clone() as Arc<dyn NetworkGateway>,
        cache.clone() as Arc<dyn CacheStore>,
        queue.clone() as Arc<dyn ActionQueue>,
        sink.clone() as Arc<dyn EventSink>,
        connectivity.clone(),
        metrics.clone(),
    );

    let engine = Arc::new(SyncEngine::new(
        queue.clone() as Arc<dyn ActionQueue>,
        gateway as Arc<dyn NetworkGateway>,
        sink.clone() as Arc<dyn EventSink>,
        metrics.clone(),
        QueueConfig::default(),
    ));

    TestStack { cache, queue, connectivity, metrics, sink, router, engine }
}

/// An origin with nothing listening on it. The port is bound and released
/// so the next connect attempt is refused.
pub fn dead_origin() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral port should bind");
    let addr = listener.local_addr().expect("bound socket has an address");
    drop(listener);
    format!("http://{addr}")
}
