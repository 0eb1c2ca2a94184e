//! HTTP infrastructure: the uplink gateway

pub mod gateway;

pub use gateway::HttpGateway;
