//! Engine configuration structures
//!
//! All tunables for the cache, queue, sync, routing, and storage layers.
//! Loaded from environment variables or a config file by the infra loader;
//! every section has sensible defaults so a bare `Config::default()` is a
//! working development configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_BASE_SECS, DEFAULT_BACKOFF_CAP_SECS, DEFAULT_COLLECTION_CAPACITY,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_NETWORK_TIMEOUT_SECS, DEFAULT_QUERY_TIMEOUT_MS,
};
use crate::errors::{Result, SatchelError};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub routes: RouteConfig,
}

/// Outbound HTTP behavior for intercepted requests and replays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Origin that origin-relative request URLs resolve against; absolute
    /// URLs are used as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds; expiry is treated as a network failure
    pub timeout_secs: u64,
    /// Transport-level retry attempts inside one logical call
    pub max_attempts: u32,
    /// Base backoff between transport retries, in milliseconds
    pub base_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_NETWORK_TIMEOUT_SECS,
            max_attempts: 3,
            base_backoff_ms: 250,
        }
    }
}

/// Cache store sizing and versioning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Item cap for each bounded collection entry
    pub collection_capacity: usize,
    /// Entry cap per namespace; oldest entries are evicted beyond this
    pub namespace_entry_cap: usize,
    /// Version tag baked into persisted namespace keys; a mismatch at
    /// startup marks the namespace stale
    pub version_tag: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            collection_capacity: DEFAULT_COLLECTION_CAPACITY,
            namespace_entry_cap: 256,
            version_tag: crate::constants::CACHE_SCHEMA_VERSION.to_string(),
        }
    }
}

/// Offline action queue replay limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Replay attempts before an action is dead-lettered
    pub max_attempts: u32,
    /// Base delay for per-action capped exponential backoff, in seconds
    pub backoff_base_secs: u64,
    /// Upper bound on the per-action backoff delay, in seconds
    pub backoff_cap_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            backoff_cap_secs: DEFAULT_BACKOFF_CAP_SECS,
        }
    }
}

/// Sync engine trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Periodic trigger interval in seconds; best-effort latency
    /// optimization only, correctness rests on connectivity-regained
    pub interval_seconds: u64,
    /// Whether the periodic trigger runs at all
    pub enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_seconds: 900, enabled: true }
    }
}

/// Notification bus limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bounded wait for point-to-point queries, in milliseconds; expiry
    /// resolves the query to a safe default instead of blocking
    pub query_timeout_ms: u64,
    /// Broadcast channel capacity; lagging subscribers miss events
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS, channel_capacity: 64 }
    }
}

/// Durable storage location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one snapshot file per namespace plus the queue
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from(".satchel") }
    }
}

/// Request routing tables for the strategy router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// URL path prefixes served network-first with cache fallback
    pub api_prefixes: Vec<String>,
    /// Exact paths served cache-first with background refresh
    pub asset_paths: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            api_prefixes: vec![
                "/api/messages".to_string(),
                "/api/folders".to_string(),
                "/api/session".to_string(),
            ],
            asset_paths: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/app.js".to_string(),
                "/app.css".to_string(),
                "/offline.html".to_string(),
                "/favicon.ico".to_string(),
            ],
        }
    }
}

impl Config {
    /// Validate configuration
    ///
    /// # Errors
    /// Returns `SatchelError::Config` when any section holds a value the
    /// engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(SatchelError::Config("HTTP timeout must be greater than 0".to_string()));
        }

        if self.http.max_attempts == 0 {
            return Err(SatchelError::Config(
                "HTTP max attempts must be greater than 0".to_string(),
            ));
        }

        if self.cache.collection_capacity == 0 {
            return Err(SatchelError::Config(
                "Collection capacity must be greater than 0".to_string(),
            ));
        }

        if self.cache.namespace_entry_cap == 0 {
            return Err(SatchelError::Config(
                "Namespace entry cap must be greater than 0".to_string(),
            ));
        }

        if self.cache.version_tag.is_empty() {
            return Err(SatchelError::Config("Cache version tag must not be empty".to_string()));
        }

        if self.queue.max_attempts == 0 {
            return Err(SatchelError::Config(
                "Queue max attempts must be greater than 0".to_string(),
            ));
        }

        if self.queue.backoff_cap_secs < self.queue.backoff_base_secs {
            return Err(SatchelError::Config(
                "Backoff cap cannot be below the backoff base".to_string(),
            ));
        }

        if self.bus.channel_capacity == 0 {
            return Err(SatchelError::Config(
                "Bus channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(SatchelError::Config("Storage data dir must not be empty".to_string()));
        }

        for prefix in &self.routes.api_prefixes {
            if !prefix.starts_with('/') {
                return Err(SatchelError::Config(format!(
                    "API prefix must start with '/': {prefix}"
                )));
            }
        }

        for path in &self.routes.asset_paths {
            if !path.starts_with('/') {
                return Err(SatchelError::Config(format!(
                    "Asset path must start with '/': {path}"
                )));
            }
        }

        Ok(())
    }
}
