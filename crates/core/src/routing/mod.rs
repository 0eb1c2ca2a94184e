//! Request routing: strategy decisions and cache key derivation

pub mod key;
pub mod policy;
