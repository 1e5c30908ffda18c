use thiserror::Error;

use crate::config::ConfigError;

/// Failure to obtain a pool or a connection for a logical database
///
/// Nothing is retried at the registry layer; every variant propagates to the
/// caller and leaves no registry entry behind.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The settings provider could not supply valid settings
    #[error("Redis configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The pool for a database could not be constructed
    #[error("Failed to create Redis pool for database {database}: {reason}")]
    Build { database: u32, reason: String },

    /// No connection could be checked out (unreachable, auth rejected, pool exhausted)
    #[error("Failed to get Redis connection for database {database}: {reason}")]
    Connection { database: u32, reason: String },

    /// A command on a checked-out connection failed
    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
}

impl PoolError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, PoolError::Configuration(_))
    }

    /// Pool construction or checkout failed; command errors are not included
    pub fn is_connection(&self) -> bool {
        matches!(self, PoolError::Build { .. } | PoolError::Connection { .. })
    }
}
