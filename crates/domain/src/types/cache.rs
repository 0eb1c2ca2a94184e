//! Cached response and bounded collection types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored response keyed by a canonicalized request key.
///
/// Immutable once written; updates replace the entry wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status of the captured response
    pub status: u16,
    /// Captured header subset
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Raw payload bytes
    pub body: Vec<u8>,
    /// Capture timestamp
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Capture a response body with the current timestamp.
    pub fn capture(status: u16, headers: BTreeMap<String, String>, body: Vec<u8>) -> Self {
        Self { status, headers, body, stored_at: Utc::now() }
    }
}

/// Payload of a bounded collection entry: a deduplicated, size-capped,
/// most-recent-first list of domain items (e.g. cached emails for a folder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDocument {
    /// Ordered items, unique by identifier, newest first
    pub items: Vec<serde_json::Value>,
    /// Last merge timestamp
    pub last_updated: DateTime<Utc>,
    /// Item cap enforced by every merge
    pub capacity: usize,
}

impl CollectionDocument {
    /// An empty collection with the given cap, stamped now.
    pub fn empty(capacity: usize) -> Self {
        Self { items: Vec::new(), last_updated: Utc::now(), capacity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates `CachedResponse::capture` behavior for entry construction.
    ///
    /// Assertions:
    /// - Confirms status, headers, and body are stored as given.
    /// - Confirms the capture timestamp is not in the future.
    #[test]
    fn test_capture_stores_fields() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let entry = CachedResponse::capture(200, headers.clone(), b"{}".to_vec());
        assert_eq!(entry.status, 200);
        assert_eq!(entry.headers, headers);
        assert_eq!(entry.body, b"{}".to_vec());
        assert!(entry.stored_at <= Utc::now());
    }
}
