//! Strategy selection for intercepted requests
//!
//! Inspects method and URL and picks one of four handling classes. The
//! tables driving the match come from configuration; the decision itself
//! is pure.

use satchel_domain::RouteConfig;

use crate::routing::key::request_path;

/// How the router should handle one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Dynamic API data: try the network, fall back to cache
    NetworkFirst,
    /// Static assets: serve cache, refresh in the background
    CacheFirst,
    /// Mutating request: never cached, queued when offline
    QueueIfOffline,
    /// Not intercepted; pass through untouched
    Bypass,
}

/// Pure method+URL classifier backed by the configured route tables.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    api_prefixes: Vec<String>,
    asset_paths: Vec<String>,
}

impl RoutePolicy {
    /// Build a policy from the configured route tables.
    pub fn new(routes: &RouteConfig) -> Self {
        Self { api_prefixes: routes.api_prefixes.clone(), asset_paths: routes.asset_paths.clone() }
    }

    /// Classify one request.
    ///
    /// Non-GET methods are mutations and are never cached. GETs match the
    /// API prefix table first, then the exact asset allowlist; anything
    /// else is untouched.
    pub fn decide(&self, method: &str, url: &str) -> RouteDecision {
        if !method.eq_ignore_ascii_case("GET") {
            return RouteDecision::QueueIfOffline;
        }

        let path = request_path(url);

        if self.api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return RouteDecision::NetworkFirst;
        }

        if self.asset_paths.iter().any(|asset| asset == &path) {
            return RouteDecision::CacheFirst;
        }

        RouteDecision::Bypass
    }
}
