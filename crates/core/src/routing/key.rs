//! Canonical cache key derivation
//!
//! Cached entries are keyed by path plus sorted query string. The scheme,
//! host, and fragment are dropped: the engine serves a single origin, and
//! fragments never reach the network. Keys are method-insensitive because
//! only GET responses are ever cached.

use url::Url;

// Origin-relative URLs need a base to parse against; the host is discarded
// from the key afterwards.
const PARSE_BASE: &str = "http://origin.invalid";

/// Derive the canonical cache key for a request URL.
///
/// Query parameters are sorted so `?a=1&b=2` and `?b=2&a=1` share one
/// entry. Unparseable input falls back to the raw string minus any
/// fragment.
pub fn canonical_key(raw_url: &str) -> String {
    match parse(raw_url) {
        Some(url) => {
            let mut pairs: Vec<(String, String)> =
                url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
            pairs.sort();

            if pairs.is_empty() {
                url.path().to_string()
            } else {
                let query: Vec<String> =
                    pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{}?{}", url.path(), query.join("&"))
            }
        }
        None => strip_fragment(raw_url).to_string(),
    }
}

/// The path component of a request URL, used for route matching.
pub fn request_path(raw_url: &str) -> String {
    match parse(raw_url) {
        Some(url) => url.path().to_string(),
        None => {
            let trimmed = strip_fragment(raw_url);
            trimmed.split('?').next().unwrap_or(trimmed).to_string()
        }
    }
}

fn parse(raw_url: &str) -> Option<Url> {
    Url::parse(raw_url)
        .or_else(|_| Url::parse(PARSE_BASE).and_then(|base| base.join(raw_url)))
        .ok()
}

fn strip_fragment(raw_url: &str) -> &str {
    raw_url.split('#').next().unwrap_or(raw_url)
}
