//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use satchel_core::{ActionQueue, CacheStore, EventSink, NetworkGateway};
use satchel_domain::{Config, Result};
use satchel_infra::{
    ConnectivityMonitor, EngineMetrics, HttpGateway, PersistedActionQueue, PersistentCacheStore,
    SnapshotStore, StrategyRouter, StrategyRouterConfig, SyncEngine, SyncWorker, SyncWorkerConfig,
};
use tracing::info;

use crate::bus::NotificationBus;
use crate::engine::Engine;
use crate::handle::EngineHandle;

/// Application context - holds the wired engine and its shared parts.
///
/// Construction only wires dependencies; nothing is fetched or started.
/// Callers run the engine lifecycle (`initialize`, `take_ownership`)
/// themselves, which keeps tests free to exercise each phase.
pub struct AppContext {
    pub config: Config,
    pub cache: Arc<PersistentCacheStore>,
    pub queue: Arc<PersistedActionQueue>,
    pub connectivity: ConnectivityMonitor,
    pub metrics: Arc<EngineMetrics>,
    pub bus: Arc<NotificationBus>,
    pub engine: Arc<Engine>,
}

impl AppContext {
    /// Wire every component from configuration.
    ///
    /// Opening the stores restores persisted state (cache namespaces and
    /// the offline queue) from the configured data directory.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let snapshots = SnapshotStore::new(&config.storage.data_dir);
        let cache = Arc::new(PersistentCacheStore::open(snapshots.clone(), &config.cache).await);
        let queue = Arc::new(PersistedActionQueue::open(snapshots).await);
        let gateway = Arc::new(HttpGateway::from_config(&config.http)?);

        // Until the host reports otherwise, assume the network is there;
        // the first failed fetch degrades gracefully anyway.
        let connectivity = ConnectivityMonitor::new(true);
        let metrics = Arc::new(EngineMetrics::new());
        let bus = Arc::new(NotificationBus::new(&config.bus));

        let router = StrategyRouter::new(
            StrategyRouterConfig { routes: config.routes.clone(), background_refresh: true },
            Arc::clone(&gateway) as Arc<dyn NetworkGateway>,
            Arc::clone(&cache) as Arc<dyn CacheStore>,
            Arc::clone(&queue) as Arc<dyn ActionQueue>,
            Arc::clone(&bus) as Arc<dyn EventSink>,
            connectivity.clone(),
            Arc::clone(&metrics),
        );

        let sync_engine = Arc::new(SyncEngine::new(
            Arc::clone(&queue) as Arc<dyn ActionQueue>,
            Arc::clone(&gateway) as Arc<dyn NetworkGateway>,
            Arc::clone(&bus) as Arc<dyn EventSink>,
            Arc::clone(&metrics),
            config.queue.clone(),
        ));

        let worker_config = SyncWorkerConfig::from(&config.sync);
        let worker = SyncWorker::new(sync_engine, connectivity.clone(), worker_config);

        let engine = Arc::new(Engine::new(
            config.clone(),
            Arc::clone(&cache),
            Arc::clone(&queue),
            gateway,
            router,
            connectivity.clone(),
            Arc::clone(&bus),
            Arc::clone(&metrics),
            worker,
        ));

        info!(data_dir = %config.storage.data_dir.display(), "application context ready");

        Ok(Self { config, cache, queue, connectivity, metrics, bus, engine })
    }

    /// A client handle bound to this context's engine and query timeout.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(
            Arc::clone(&self.engine),
            Duration::from_millis(self.config.bus.query_timeout_ms),
        )
    }

    /// Graceful shutdown: stops background sync. The stores need no
    /// explicit cleanup; snapshots are written after every mutation.
    pub async fn shutdown(&self) -> Result<()> {
        self.engine.shutdown().await
    }
}
