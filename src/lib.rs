//! Lazily created, shared Redis connection pools, one per logical database.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod registry;

// Re-export commonly used types for convenience
pub use crate::config::{ConfigError, ConfigLoader, PoolSettings, RedisSettings, SettingsProvider};
pub use error::PoolError;
pub use pool::{ConnectionPool, PoolFactory, PoolStatus, RedisConnection, RedisPool, RedisPoolFactory};
pub use registry::{PoolRegistry, RedisPoolRegistry};
