//! Per-database connection pools
//!
//! The registry only depends on the two traits defined here. The production
//! implementation, [`RedisPool`], wraps an `r2d2` pool of
//! `redis::Connection`s; tests substitute their own factory to observe how
//! often pools are built.

mod redis_pool;

pub use redis_pool::{RedisConnection, RedisConnectionManager, RedisPool, RedisPoolFactory};

use serde::{Deserialize, Serialize};

use crate::config::{PoolSettings, RedisSettings};
use crate::error::PoolError;

/// A bounded set of reusable connections to one logical database
///
/// Implementations must be safe to share between threads. The connection
/// handed out by [`ConnectionPool::get`] is a guard: dropping it returns the
/// connection to the pool.
pub trait ConnectionPool: Send + Sync + 'static {
    type Connection;

    /// Check out a connection, waiting up to the configured `max_wait`
    fn get(&self) -> Result<Self::Connection, PoolError>;

    /// Logical database index this pool connects to
    fn database(&self) -> u32;

    /// Sizing the pool was built with
    fn settings(&self) -> &PoolSettings;

    fn status(&self) -> PoolStatus;
}

/// Builds a pool for a database from the current settings
pub trait PoolFactory: Send + Sync {
    type Pool: ConnectionPool;

    fn create(&self, settings: &RedisSettings, database: u32) -> Result<Self::Pool, PoolError>;
}

/// Point-in-time snapshot of a pool's connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Open connections, idle and checked out
    pub connections: u32,
    /// Open connections currently idle in the pool
    pub idle_connections: u32,
}

impl PoolStatus {
    pub fn in_use(&self) -> u32 {
        self.connections.saturating_sub(self.idle_connections)
    }
}
