use std::fmt;
use std::time::Duration;

use r2d2::{HandleError, ManageConnection, Pool, PooledConnection};
use redis::{Client, Connection, ConnectionLike, RedisError};

use super::{ConnectionPool, PoolFactory, PoolStatus};
use crate::config::{PoolSettings, RedisSettings, Validate};
use crate::error::PoolError;

/// Connection checked out of a [`RedisPool`], returned to it on drop
pub type RedisConnection = PooledConnection<RedisConnectionManager>;

/// `r2d2` manager opening `redis::Connection`s with the configured timeout
///
/// The connection info already carries the database index and credentials,
/// so every connection issues AUTH and SELECT while connecting.
#[derive(Clone)]
pub struct RedisConnectionManager {
    client: Client,
    address: String,
    database: u32,
    timeout: Duration,
}

impl RedisConnectionManager {
    pub fn new(settings: &RedisSettings, database: u32) -> Result<Self, RedisError> {
        let client = Client::open(settings.connection_info(database))?;

        Ok(Self {
            client,
            address: settings.address(),
            database,
            timeout: settings.timeout(),
        })
    }
}

// Client's Debug prints the connection info, password included
impl fmt::Debug for RedisConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConnectionManager")
            .field("address", &self.address)
            .field("database", &self.database)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ManageConnection for RedisConnectionManager {
    type Connection = Connection;
    type Error = RedisError;

    fn connect(&self) -> Result<Connection, RedisError> {
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut Connection) -> Result<(), RedisError> {
        redis::cmd("PING").query::<String>(conn)?;
        Ok(())
    }

    fn has_broken(&self, conn: &mut Connection) -> bool {
        !conn.is_open()
    }
}

/// Routes connection errors raised inside `r2d2` to `tracing`
#[derive(Debug)]
struct TracingErrorHandler {
    database: u32,
    address: String,
}

impl<E: fmt::Display> HandleError<E> for TracingErrorHandler {
    fn handle_error(&self, error: E) {
        tracing::warn!(
            database = self.database,
            address = %self.address,
            error = %error,
            "Redis connection attempt failed"
        );
    }
}

/// Pool of connections to one logical Redis database
///
/// Construction does not open any connection; the first checkout (or the
/// `min_idle` replenisher) connects. Connection failures therefore surface
/// from [`ConnectionPool::get`], bounded by `pool.max_wait`.
pub struct RedisPool {
    pool: Pool<RedisConnectionManager>,
    database: u32,
    address: String,
    settings: PoolSettings,
}

impl RedisPool {
    #[tracing::instrument(skip(settings), fields(address = %settings.address()))]
    pub fn new(settings: &RedisSettings, database: u32) -> Result<Self, PoolError> {
        // r2d2 panics on a zero max_size or min_idle > max_size
        settings.validate()?;

        let manager =
            RedisConnectionManager::new(settings, database).map_err(|e| PoolError::Build {
                database,
                reason: e.to_string(),
            })?;

        let address = settings.address();
        let pool = Pool::builder()
            .max_size(settings.pool.max_active)
            .min_idle(Some(settings.pool.min_idle))
            .connection_timeout(settings.pool.max_wait())
            .idle_timeout(settings.pool.idle_timeout())
            .error_handler(Box::new(TracingErrorHandler {
                database,
                address: address.clone(),
            }))
            .build_unchecked(manager);

        tracing::debug!(
            max_active = settings.pool.max_active,
            max_idle = settings.pool.max_idle,
            min_idle = settings.pool.min_idle,
            max_wait_ms = settings.pool.max_wait,
            "Redis pool created"
        );

        Ok(Self {
            pool,
            database,
            address,
            settings: settings.pool,
        })
    }

    /// `host:port` of the server this pool connects to
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl ConnectionPool for RedisPool {
    type Connection = RedisConnection;

    fn get(&self) -> Result<RedisConnection, PoolError> {
        self.pool.get().map_err(|e| PoolError::Connection {
            database: self.database,
            reason: e.to_string(),
        })
    }

    fn database(&self) -> u32 {
        self.database
    }

    fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    fn status(&self) -> PoolStatus {
        let state = self.pool.state();
        PoolStatus {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }
}

impl fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisPool")
            .field("address", &self.address)
            .field("database", &self.database)
            .field("settings", &self.settings)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Factory building a [`RedisPool`] per database
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisPoolFactory;

impl PoolFactory for RedisPoolFactory {
    type Pool = RedisPool;

    fn create(&self, settings: &RedisSettings, database: u32) -> Result<RedisPool, PoolError> {
        RedisPool::new(settings, database)
    }
}
