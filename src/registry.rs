//! Registry of per-database connection pools
//!
//! A [`PoolRegistry`] maps a logical database index to a lazily created,
//! shared pool. Lookups of existing pools go through a concurrent map and
//! never block on the registry lock; creating a pool for an index seen for
//! the first time happens under a single registry-wide mutex with a re-check,
//! so at most one pool is ever built per index.
//!
//! # Example
//!
//! ```no_run
//! use lighter_redis::config::ConfigLoader;
//! use lighter_redis::registry::PoolRegistry;
//!
//! # fn example() -> Result<(), lighter_redis::PoolError> {
//! let registry = PoolRegistry::redis(ConfigLoader::new());
//!
//! let pong: String = registry.with_connection(0, |conn| {
//!     Ok::<_, lighter_redis::PoolError>(redis::cmd("PING").query(&mut **conn)?)
//! })?;
//! assert_eq!(pong, "PONG");
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::config::{ConfigLoader, SettingsProvider};
use crate::error::PoolError;
use crate::metrics::RegistryMetrics;
use crate::pool::{ConnectionPool, PoolFactory, PoolStatus, RedisPoolFactory};

/// Connection type handed out by a registry using factory `F`
pub type Connection<F> = <<F as PoolFactory>::Pool as ConnectionPool>::Connection;

/// Registry backed by real Redis pools
pub type RedisPoolRegistry<S = ConfigLoader> = PoolRegistry<S, RedisPoolFactory>;

/// Get-or-create registry of connection pools keyed by database index
///
/// Entries are never removed or replaced. Dropping the registry drops its
/// pools, which closes their connections.
pub struct PoolRegistry<S, F: PoolFactory> {
    provider: S,
    factory: F,
    pools: DashMap<u32, Arc<F::Pool>>,
    /// Serializes pool creation; never held while checking out a connection
    create_lock: Mutex<()>,
    metrics: RegistryMetrics,
}

impl<S: SettingsProvider> PoolRegistry<S, RedisPoolFactory> {
    pub fn redis(provider: S) -> Self {
        Self::new(provider, RedisPoolFactory)
    }
}

impl<S: SettingsProvider, F: PoolFactory> PoolRegistry<S, F> {
    pub fn new(provider: S, factory: F) -> Self {
        let shards = (num_cpus::get() * 4).next_power_of_two().max(2);

        Self {
            provider,
            factory,
            pools: DashMap::with_shard_amount(shards),
            create_lock: Mutex::new(()),
            metrics: RegistryMetrics::new(),
        }
    }

    /// Check out a connection for `database`, creating its pool on first use
    ///
    /// The returned connection goes back to its pool when dropped.
    #[tracing::instrument(skip(self))]
    pub fn get_connection(&self, database: u32) -> Result<Connection<F>, PoolError> {
        let pool = self.pool(database)?;

        match pool.get() {
            Ok(conn) => {
                self.metrics.record_checkout(database, true);
                Ok(conn)
            }
            Err(error) => {
                self.metrics.record_checkout(database, false);
                tracing::error!(error = %error, "Failed to check out Redis connection");
                Err(error)
            }
        }
    }

    /// Run `f` with a connection for `database`
    ///
    /// The connection is released when `f` returns, on success and on error.
    pub fn with_connection<T, E>(
        &self,
        database: u32,
        f: impl FnOnce(&mut Connection<F>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<PoolError>,
    {
        let mut conn = self.get_connection(database)?;
        f(&mut conn)
    }

    /// Pool for `database`, created from freshly read settings if absent
    pub fn pool(&self, database: u32) -> Result<Arc<F::Pool>, PoolError> {
        if let Some(pool) = self.cached(database) {
            tracing::trace!(database, "Redis pool cache hit");
            return Ok(pool);
        }

        // The guarded value is (), so a panic in another creator leaves nothing to repair
        let _guard = self
            .create_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(pool) = self.cached(database) {
            tracing::debug!(database, "Redis pool created by a concurrent caller");
            return Ok(pool);
        }

        self.create(database)
    }

    /// Create every pool in `databases` up front
    pub fn warm_up(&self, databases: impl IntoIterator<Item = u32>) -> Result<(), PoolError> {
        for database in databases {
            self.pool(database)?;
        }
        Ok(())
    }

    pub fn contains(&self, database: u32) -> bool {
        self.pools.contains_key(&database)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Database indices that have a pool, ascending
    pub fn databases(&self) -> Vec<u32> {
        let mut databases: Vec<u32> = self.pools.iter().map(|entry| *entry.key()).collect();
        databases.sort_unstable();
        databases
    }

    /// Connection counts of every pool
    pub fn status(&self) -> BTreeMap<u32, PoolStatus> {
        self.pools
            .iter()
            .map(|entry| (*entry.key(), entry.value().status()))
            .collect()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn provider(&self) -> &S {
        &self.provider
    }

    fn cached(&self, database: u32) -> Option<Arc<F::Pool>> {
        self.pools.get(&database).map(|entry| Arc::clone(entry.value()))
    }

    /// Caller must hold `create_lock`
    fn create(&self, database: u32) -> Result<Arc<F::Pool>, PoolError> {
        let built = self
            .provider
            .redis_settings()
            .map_err(PoolError::from)
            .and_then(|settings| {
                tracing::info!(
                    database,
                    address = %settings.address(),
                    max_active = settings.pool.max_active,
                    "Creating Redis pool"
                );
                self.factory.create(&settings, database)
            });

        let pool = match built {
            Ok(pool) => Arc::new(pool),
            Err(error) => {
                self.metrics.record_pool_creation_failure(database);
                tracing::error!(database, error = %error, "Failed to create Redis pool");
                return Err(error);
            }
        };

        self.pools.insert(database, Arc::clone(&pool));
        self.metrics.record_pool_created(database, self.pools.len());

        Ok(pool)
    }
}

impl<S, F: PoolFactory> fmt::Debug for PoolRegistry<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut databases: Vec<u32> = self.pools.iter().map(|entry| *entry.key()).collect();
        databases.sort_unstable();

        f.debug_struct("PoolRegistry")
            .field("databases", &databases)
            .finish_non_exhaustive()
    }
}
