//! Engine orchestration and lifecycle
//!
//! [`Engine`] owns every moving part: the stores, the strategy router, the
//! sync worker, and the notification bus. Its lifecycle is two-phase,
//! mirroring a service worker's install/activate split:
//!
//! 1. `initialize`: pre-warm the static asset cache so the application
//!    shell renders on a cold offline start. Persisted state (cache
//!    namespaces, the offline queue) was already restored when the stores
//!    were opened.
//! 2. `take_ownership`: drop cache namespaces written by older schema
//!    versions, then start background sync. From here the engine is the
//!    authority for intercepted requests.

use std::sync::Arc;

use futures::future::join_all;
use satchel_core::{canonical_key, ActionQueue, CacheStore, EventSink, NetworkGateway};
use satchel_domain::constants::NS_STATIC_ASSETS;
use satchel_domain::{
    ActionQueuedPayload, CachedItemsPayload, CachedResponse, Config, EngineEvent, EngineRequest,
    OfflineAction, OfflineStatusPayload, RequestDescriptor, Result, RoutedResponse, SatchelError,
};
use satchel_infra::{
    ConnectivityMonitor, EngineMetrics, HttpGateway, PersistedActionQueue, PersistentCacheStore,
    StrategyRouter, SyncWorker,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::bus::NotificationBus;

/// The offline engine: routes intercepted requests, captures mutations,
/// replays them, and keeps clients informed through the bus.
pub struct Engine {
    config: Config,
    cache: Arc<PersistentCacheStore>,
    queue: Arc<PersistedActionQueue>,
    gateway: Arc<HttpGateway>,
    router: StrategyRouter,
    connectivity: ConnectivityMonitor,
    bus: Arc<NotificationBus>,
    metrics: Arc<EngineMetrics>,
    worker: Mutex<SyncWorker>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        cache: Arc<PersistentCacheStore>,
        queue: Arc<PersistedActionQueue>,
        gateway: Arc<HttpGateway>,
        router: StrategyRouter,
        connectivity: ConnectivityMonitor,
        bus: Arc<NotificationBus>,
        metrics: Arc<EngineMetrics>,
        worker: SyncWorker,
    ) -> Self {
        Self {
            config,
            cache,
            queue,
            gateway,
            router,
            connectivity,
            bus,
            metrics,
            worker: Mutex::new(worker),
        }
    }

    /// Install phase. Pre-warms the static asset namespace so the shell is
    /// available on the first offline launch. Individual fetch failures are
    /// logged and skipped; installation never fails on a cold network.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let pending = self.queue.size().await?;
        info!(queued_actions = pending, "engine state restored from disk");

        let total = self.config.routes.asset_paths.len();
        let warmed = self.prewarm_static_assets().await;
        info!(warmed, total, "static asset pre-warm finished");

        Ok(())
    }

    /// Activate phase. Drops namespaces persisted under older schema
    /// versions and starts the sync worker.
    #[instrument(skip(self))]
    pub async fn take_ownership(&self) -> Result<()> {
        let purged = self.cache.purge_stale_namespaces().await?;
        if !purged.is_empty() {
            info!(purged = purged.len(), "dropped cache namespaces from older schema versions");
        }

        self.worker.lock().await.start().await.map_err(SatchelError::Internal)?;
        info!("engine owns request interception");
        Ok(())
    }

    /// Route one intercepted request through the strategy table.
    pub async fn fetch(&self, request: RequestDescriptor) -> Result<RoutedResponse> {
        self.router.handle(request).await
    }

    /// Dispatch one engine-bound protocol message. Query replies are both
    /// returned to the caller and published on the bus, so every connected
    /// client converges on the same view.
    pub async fn handle_request(&self, request: EngineRequest) -> Result<Option<EngineEvent>> {
        match request {
            EngineRequest::CacheItems(payload) => {
                let incoming = payload.items.len();
                let merged = self
                    .cache
                    .merge_collection(
                        &payload.collection_key,
                        payload.items,
                        self.config.cache.collection_capacity,
                    )
                    .await?;
                debug!(
                    collection_key = %payload.collection_key,
                    incoming,
                    stored = merged.items.len(),
                    "collection items cached"
                );
                Ok(None)
            }
            EngineRequest::GetCachedItems(payload) => {
                let items = self.cache.collection_items(&payload.collection_key).await?;
                let event = EngineEvent::CachedItems(CachedItemsPayload {
                    collection_key: payload.collection_key,
                    items,
                });
                self.bus.publish(event.clone());
                Ok(Some(event))
            }
            EngineRequest::ClearCache => {
                self.cache.clear_all().await?;
                self.queue.clear().await?;
                info!("cache and offline queue cleared");
                Ok(None)
            }
            EngineRequest::QueueAction(payload) => {
                let action =
                    OfflineAction::new(payload.method, payload.url, payload.headers, payload.body);
                self.capture_action(action).await.map(Some)
            }
            EngineRequest::GetOfflineStatus => {
                let event = EngineEvent::OfflineStatus(self.offline_status().await?);
                self.bus.publish(event.clone());
                Ok(Some(event))
            }
        }
    }

    /// Current connectivity plus pending queue depth.
    pub async fn offline_status(&self) -> Result<OfflineStatusPayload> {
        Ok(OfflineStatusPayload {
            is_online: self.connectivity.is_online(),
            queued_actions: self.queue.size().await?,
        })
    }

    /// Host hook for connectivity edges. Coming back online wakes the sync
    /// worker through the shared watch channel; the new status is broadcast
    /// either way.
    pub async fn on_connectivity_changed(&self, online: bool) -> Result<()> {
        self.connectivity.set_online(online);
        let status = self.offline_status().await?;
        debug!(online, queued_actions = status.queued_actions, "connectivity changed");
        self.bus.publish(EngineEvent::OfflineStatus(status));
        Ok(())
    }

    /// Ask for a replay pass outside the regular schedule. Coalesces with
    /// any pass already pending on the worker.
    pub async fn request_sync(&self) {
        self.worker.lock().await.trigger();
    }

    /// New bus subscription, seeing events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    /// Stop background sync. Safe to call when the worker was never
    /// started.
    pub async fn shutdown(&self) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_running() {
            worker.stop().await.map_err(SatchelError::Internal)?;
        }
        info!("engine shut down");
        Ok(())
    }

    async fn capture_action(&self, action: OfflineAction) -> Result<EngineEvent> {
        let action_id = action.id;
        let queue_length = self.queue.enqueue(action).await?;
        self.metrics.record_action_queued();
        debug!(%action_id, queue_length, "action captured for later replay");

        let event = EngineEvent::ActionQueued(ActionQueuedPayload { action_id, queue_length });
        self.bus.publish(event.clone());
        Ok(event)
    }

    async fn prewarm_static_assets(&self) -> usize {
        let fetches = self.config.routes.asset_paths.iter().map(|path| {
            let gateway = Arc::clone(&self.gateway);
            let cache = Arc::clone(&self.cache);
            async move {
                let request = RequestDescriptor::get(path.clone());
                match gateway.execute(&request).await {
                    Ok(response) if response.is_success() => {
                        let entry = CachedResponse::capture(
                            response.status,
                            response.headers,
                            response.body,
                        );
                        let key = canonical_key(path);
                        match cache.write(NS_STATIC_ASSETS, &key, entry).await {
                            Ok(()) => true,
                            Err(err) => {
                                warn!(path = %path, error = %err, "pre-warmed asset not cached");
                                false
                            }
                        }
                    }
                    Ok(response) => {
                        debug!(path = %path, status = response.status, "asset pre-warm skipped");
                        false
                    }
                    Err(err) => {
                        debug!(path = %path, error = %err, "asset pre-warm fetch failed");
                        false
                    }
                }
            }
        });

        join_all(fetches).await.into_iter().filter(|warmed| *warmed).count()
    }
}
