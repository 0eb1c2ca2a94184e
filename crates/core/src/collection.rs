//! Bounded collection merge rules
//!
//! A collection cache holds a deduplicated, size-capped, most-recent-first
//! list of domain items. Merging is pure: callers hand in the existing and
//! incoming item lists and store whatever comes back.

use std::collections::HashSet;

use serde_json::Value;

/// The stable identity of one collection item.
///
/// Items carry a string or numeric `id` field; an item without one falls
/// back to its full serialized form, so structurally identical id-less
/// items dedup while distinct ones never collide.
pub fn item_identity(item: &Value) -> String {
    match item.get("id") {
        Some(Value::String(id)) => format!("id:{id}"),
        Some(Value::Number(id)) => format!("id:{id}"),
        _ => format!("raw:{item}"),
    }
}

/// Merge `incoming` items into `existing`, newest first, capped.
///
/// Incoming items win on identity conflict and land at the front; existing
/// items keep their relative order behind them; everything beyond
/// `capacity` is evicted oldest-by-position.
pub fn merge_items(existing: &[Value], incoming: &[Value], capacity: usize) -> Vec<Value> {
    let mut seen: HashSet<String> = HashSet::with_capacity(existing.len() + incoming.len());
    let mut merged: Vec<Value> = Vec::with_capacity(capacity.min(existing.len() + incoming.len()));

    for item in incoming.iter().chain(existing.iter()) {
        if merged.len() >= capacity {
            break;
        }
        if seen.insert(item_identity(item)) {
            merged.push(item.clone());
        }
    }

    merged
}
