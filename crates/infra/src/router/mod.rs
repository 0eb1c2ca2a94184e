//! Request routing strategies

pub mod strategy;

pub use strategy::{StrategyRouter, StrategyRouterConfig};
