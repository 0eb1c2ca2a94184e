//! Connectivity signal shared between the engine and its workers

pub mod connectivity;

pub use connectivity::ConnectivityMonitor;
