//! # Satchel application layer
//!
//! Wires the engine together and exposes it to hosts and clients.
//!
//! This crate contains:
//! - The notification bus (engine → client events)
//! - The engine itself (lifecycle, routing, protocol dispatch)
//! - `EngineHandle` (what foreground clients hold)
//! - `AppContext` (dependency wiring) and the standalone host binary
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Owns the process lifecycle: initialize, take ownership, shutdown

pub mod bus;
pub mod context;
pub mod engine;
pub mod handle;

// Re-export for convenience
pub use bus::NotificationBus;
pub use context::AppContext;
pub use engine::Engine;
pub use handle::EngineHandle;
