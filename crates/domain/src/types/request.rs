//! Request and response shapes crossing the router boundary

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    ACTION_QUEUED_STATUS_CODE, CACHE_MARKER_HEADER, OFFLINE_ERROR_KIND, OFFLINE_STATUS_CODE,
};
use crate::types::cache::CachedResponse;

/// An outgoing request as seen by the strategy router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// HTTP method, uppercase
    pub method: String,
    /// Full URL or origin-relative path
    pub url: String,
    /// Headers forwarded to the network call
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request payload; absent for body-less requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// A bare GET for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".to_string(), url: url.into(), headers: BTreeMap::new(), body: None }
    }

    /// Whether this request mutates server state. Anything that is not a
    /// GET is treated as a mutation and is never cached.
    pub fn is_mutation(&self) -> bool {
        !self.method.eq_ignore_ascii_case("GET")
    }
}

/// A raw response from the network gateway, before routing semantics apply.
///
/// Any status is a successful gateway call; transport failures surface as
/// errors instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The response handed back to the original caller by the router.
///
/// Every router path terminates in one of these; failures inside the engine
/// never propagate as errors to the intercepted caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedResponse {
    /// HTTP status (or the synthetic offline status)
    pub status: u16,
    /// Response headers, including the cache marker when applicable
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response payload bytes
    pub body: Vec<u8>,
    /// True when the payload came from the cache rather than the network
    pub served_from_cache: bool,
}

impl RoutedResponse {
    /// Wrap a live network response, unmarked.
    pub fn from_network(status: u16, headers: BTreeMap<String, String>, body: Vec<u8>) -> Self {
        Self { status, headers, body, served_from_cache: false }
    }

    /// Wrap a cached entry, stamped with the cache marker header so callers
    /// can distinguish degraded responses.
    pub fn from_cached(entry: &CachedResponse, marker: &str) -> Self {
        let mut headers = entry.headers.clone();
        headers.insert(CACHE_MARKER_HEADER.to_string(), marker.to_string());
        Self { status: entry.status, headers, body: entry.body.clone(), served_from_cache: true }
    }

    /// The synthetic "offline, not cached" error response: status 503 with
    /// a structured body carrying a machine-readable kind.
    pub fn offline_fallback(message: &str) -> Self {
        let body = serde_json::json!({
            "error": "offline",
            "kind": OFFLINE_ERROR_KIND,
            "message": message,
        });
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            status: OFFLINE_STATUS_CODE,
            headers,
            body: serde_json::to_vec(&body).unwrap_or_default(),
            served_from_cache: false,
        }
    }

    /// The synthetic "accepted for later replay" response handed back when
    /// a mutation was captured into the offline queue instead of sent.
    pub fn action_queued(action_id: Uuid, queue_length: usize) -> Self {
        let body = serde_json::json!({
            "queued": true,
            "actionId": action_id,
            "queueLength": queue_length,
        });
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            status: ACTION_QUEUED_STATUS_CODE,
            headers,
            body: serde_json::to_vec(&body).unwrap_or_default(),
            served_from_cache: false,
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
