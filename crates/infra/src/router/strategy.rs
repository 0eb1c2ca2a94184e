//! The strategy router
//!
//! One entry point, [`StrategyRouter::handle`], classifies each request and
//! runs the matching strategy: network first with cache fallback for API
//! data, cache first with background refresh for the application shell,
//! offline capture for mutations, plain pass-through for everything else.
//! Intercepted routes always end in a [`RoutedResponse`]; the caller never
//! sees a transport error for them. Successful responses observed here are
//! the only path by which the response cache is populated.

use std::sync::Arc;

use satchel_core::{
    canonical_key, ActionQueue, CacheStore, EventSink, NetworkGateway, RouteDecision, RoutePolicy,
};
use satchel_domain::config::RouteConfig;
use satchel_domain::constants::{
    CACHE_MARKER_FALLBACK, CACHE_MARKER_HIT, NS_API_RESPONSES, NS_STATIC_ASSETS,
};
use satchel_domain::{
    ActionQueuedPayload, CachedResponse, EngineEvent, OfflineAction, RemoteResponse,
    RequestDescriptor, Result, RoutedResponse,
};
use tracing::{debug, info, instrument, warn};

use crate::net::ConnectivityMonitor;
use crate::observability::EngineMetrics;

/// Router knobs.
#[derive(Debug, Clone)]
pub struct StrategyRouterConfig {
    /// Route tables driving strategy selection
    pub routes: RouteConfig,
    /// Re-fetch assets after serving them from cache. Disabled in tests
    /// that need a deterministic call count.
    pub background_refresh: bool,
}

impl Default for StrategyRouterConfig {
    fn default() -> Self {
        Self { routes: RouteConfig::default(), background_refresh: true }
    }
}

/// Executes the caching strategies over the engine's ports.
pub struct StrategyRouter {
    policy: RoutePolicy,
    gateway: Arc<dyn NetworkGateway>,
    cache: Arc<dyn CacheStore>,
    queue: Arc<dyn ActionQueue>,
    events: Arc<dyn EventSink>,
    connectivity: ConnectivityMonitor,
    metrics: Arc<EngineMetrics>,
    background_refresh: bool,
}

impl StrategyRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: StrategyRouterConfig,
        gateway: Arc<dyn NetworkGateway>,
        cache: Arc<dyn CacheStore>,
        queue: Arc<dyn ActionQueue>,
        events: Arc<dyn EventSink>,
        connectivity: ConnectivityMonitor,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            policy: RoutePolicy::new(&config.routes),
            gateway,
            cache,
            queue,
            events,
            connectivity,
            metrics,
            background_refresh: config.background_refresh,
        }
    }

    /// Route one request.
    ///
    /// # Errors
    /// Only pass-through (unintercepted) requests and queue persistence can
    /// surface errors; every intercepted strategy path degrades internally.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn handle(&self, request: RequestDescriptor) -> Result<RoutedResponse> {
        match self.policy.decide(&request.method, &request.url) {
            RouteDecision::NetworkFirst => Ok(self.network_first(&request).await),
            RouteDecision::CacheFirst => Ok(self.cache_first(&request).await),
            RouteDecision::QueueIfOffline => self.capture_or_send(request).await,
            RouteDecision::Bypass => self.pass_through(&request).await,
        }
    }

    /// Network first with cache fallback: live data when reachable, last
    /// known copy when not.
    async fn network_first(&self, request: &RequestDescriptor) -> RoutedResponse {
        let key = canonical_key(&request.url);

        match self.gateway.execute(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.cache_response(NS_API_RESPONSES, &key, &response).await;
                }
                RoutedResponse::from_network(response.status, response.headers, response.body)
            }
            Err(err) => {
                debug!(error = %err, "network-first call failed, trying the cache");
                self.metrics.record_degraded_response();

                match self.cached(NS_API_RESPONSES, &key).await {
                    Some(entry) => {
                        self.metrics.record_cache_hit();
                        RoutedResponse::from_cached(&entry, CACHE_MARKER_FALLBACK)
                    }
                    None => {
                        self.metrics.record_cache_miss();
                        warn!(url = %request.url, "offline with no cached copy");
                        RoutedResponse::offline_fallback(&format!(
                            "no cached copy of {}",
                            request.url
                        ))
                    }
                }
            }
        }
    }

    /// Cache first with background refresh: a hit is served immediately and
    /// the entry is re-fetched out of band for next time.
    async fn cache_first(&self, request: &RequestDescriptor) -> RoutedResponse {
        let key = canonical_key(&request.url);

        if let Some(entry) = self.cached(NS_STATIC_ASSETS, &key).await {
            self.metrics.record_cache_hit();
            self.spawn_background_refresh(request.clone(), key);
            return RoutedResponse::from_cached(&entry, CACHE_MARKER_HIT);
        }

        self.metrics.record_cache_miss();
        match self.gateway.execute(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.cache_response(NS_STATIC_ASSETS, &key, &response).await;
                }
                RoutedResponse::from_network(response.status, response.headers, response.body)
            }
            Err(err) => {
                debug!(error = %err, "cold-cache asset fetch failed");
                self.metrics.record_degraded_response();
                RoutedResponse::offline_fallback(&format!("no cached copy of {}", request.url))
            }
        }
    }

    /// Mutations are sent when the engine believes it is online; a capture
    /// into the offline queue covers the known-offline case and the
    /// in-flight transport failure alike.
    async fn capture_or_send(&self, request: RequestDescriptor) -> Result<RoutedResponse> {
        if self.connectivity.is_online() {
            match self.gateway.execute(&request).await {
                Ok(response) => {
                    return Ok(RoutedResponse::from_network(
                        response.status,
                        response.headers,
                        response.body,
                    ));
                }
                Err(err) => {
                    debug!(error = %err, "mutation failed in flight, capturing for replay");
                }
            }
        }

        self.capture(request).await
    }

    async fn capture(&self, request: RequestDescriptor) -> Result<RoutedResponse> {
        let action =
            OfflineAction::new(request.method, request.url, request.headers, request.body);
        let action_id = action.id;
        let queue_length = self.queue.enqueue(action).await?;

        self.metrics.record_action_queued();
        self.events.publish(EngineEvent::ActionQueued(ActionQueuedPayload {
            action_id,
            queue_length,
        }));
        info!(%action_id, queue_length, "mutation captured for later replay");

        Ok(RoutedResponse::action_queued(action_id, queue_length))
    }

    /// Unintercepted traffic: the gateway result, whatever it is.
    async fn pass_through(&self, request: &RequestDescriptor) -> Result<RoutedResponse> {
        let response = self.gateway.execute(request).await?;
        Ok(RoutedResponse::from_network(response.status, response.headers, response.body))
    }

    async fn cached(&self, namespace: &str, key: &str) -> Option<CachedResponse> {
        match self.cache.read(namespace, key).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!(namespace, key, error = %err, "cache read failed");
                None
            }
        }
    }

    async fn cache_response(&self, namespace: &str, key: &str, response: &RemoteResponse) {
        let entry = CachedResponse::capture(
            response.status,
            response.headers.clone(),
            response.body.clone(),
        );
        if let Err(err) = self.cache.write(namespace, key, entry).await {
            warn!(namespace, key, error = %err, "response served but not cached");
        }
    }

    fn spawn_background_refresh(&self, request: RequestDescriptor, key: String) {
        if !self.background_refresh {
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            match gateway.execute(&request).await {
                Ok(response) if response.is_success() => {
                    let entry = CachedResponse::capture(
                        response.status,
                        response.headers,
                        response.body,
                    );
                    if let Err(err) = cache.write(NS_STATIC_ASSETS, &key, entry).await {
                        debug!(key = %key, error = %err, "background refresh not cached");
                    }
                }
                Ok(response) => {
                    debug!(key = %key, status = response.status, "background refresh skipped");
                }
                Err(err) => {
                    debug!(key = %key, error = %err, "background refresh failed");
                }
            }
        });
    }
}
