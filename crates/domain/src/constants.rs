//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! engine.

// Persisted-state layout
pub const CACHE_SCHEMA_VERSION: &str = "v2";
pub const QUEUE_SNAPSHOT_KEY: &str = "offline-action-queue";
pub const QUEUE_SNAPSHOT_VERSION: u32 = 1;

// Cache namespace names
pub const NS_API_RESPONSES: &str = "api-responses";
pub const NS_STATIC_ASSETS: &str = "static-assets";
pub const NS_COLLECTIONS: &str = "collections";

// Degraded response contract
pub const CACHE_MARKER_HEADER: &str = "x-satchel-cache";
pub const CACHE_MARKER_FALLBACK: &str = "fallback";
pub const CACHE_MARKER_HIT: &str = "hit";
pub const OFFLINE_ERROR_KIND: &str = "OFFLINE_NOT_CACHED";
pub const OFFLINE_STATUS_CODE: u16 = 503;
pub const ACTION_QUEUED_STATUS_CODE: u16 = 202;

// Bounded waits and capacities
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_COLLECTION_CAPACITY: usize = 100;
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 30;

// Replay backoff (capped exponential, exponent clamp keeps the shift sane)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 30;
pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 3_600;
pub const BACKOFF_MAX_EXPONENT: u32 = 10;
