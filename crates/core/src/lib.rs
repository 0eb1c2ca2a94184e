//! # Satchel Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The routing policy deciding a strategy per intercepted request
//! - Canonical cache key derivation
//! - Bounded collection merge rules
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `satchel-domain`
//! - No HTTP, filesystem, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod collection;
pub mod ports;
pub mod routing;

// Re-export specific items to avoid ambiguity
pub use collection::{item_identity, merge_items};
pub use ports::{ActionQueue, CacheStore, EventSink, NetworkGateway};
pub use routing::key::{canonical_key, request_path};
pub use routing::policy::{RouteDecision, RoutePolicy};
