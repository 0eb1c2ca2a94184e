//! # Satchel Domain
//!
//! Business domain types and models for Satchel.
//!
//! This crate contains:
//! - Domain data types (OfflineAction, CachedResponse, RequestDescriptor, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and the engine message protocol
//!
//! ## Architecture
//! - No dependencies on other Satchel crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
