use std::fmt;
use std::time::Duration;

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::{Deserialize, Serialize};

use super::{ConfigError, Validate, WithDefaults};

/// Connection settings shared by every per-database pool
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisSettings {
    /// Redis server host name or address
    #[serde(default = "default_host")]
    pub host: String,
    /// Redis server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// ACL user name (Redis 6+), `None` for the default user
    #[serde(default)]
    pub username: Option<String>,
    /// Password sent with AUTH, `None` when the server has no auth
    #[serde(default)]
    pub password: Option<String>,
    /// Connect, read and write timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Pool sizing applied to each database's pool
    #[serde(default = "PoolSettings::default")]
    pub pool: PoolSettings,
}

/// Sizing of a single connection pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Maximum number of connections, idle and checked out
    #[serde(default = "default_max_active")]
    pub max_active: u32,
    /// Upper bound on idle connections, validated but not enforced by the
    /// pool; idle connections above `min_idle` are closed after `idle_timeout`
    #[serde(default = "default_max_idle")]
    pub max_idle: u32,
    /// Number of idle connections the pool tries to keep open
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,
    /// Maximum time in milliseconds a checkout waits for a free connection
    #[serde(default = "default_max_wait")]
    pub max_wait: u64,
    /// Seconds after which idle connections above `min_idle` are closed (0 = never)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
}

// Default functions for RedisSettings
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_timeout() -> u64 {
    2000
}

// Default functions for PoolSettings
fn default_max_active() -> u32 {
    8
}

fn default_max_idle() -> u32 {
    8
}

fn default_min_idle() -> u32 {
    0
}

fn default_max_wait() -> u64 {
    30_000
}

fn default_idle_timeout() -> u64 {
    600 // 10 minutes
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            timeout: default_timeout(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_active: default_max_active(),
            max_idle: default_max_idle(),
            min_idle: default_min_idle(),
            max_wait: default_max_wait(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

impl fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("pool", &self.pool)
            .finish()
    }
}

impl WithDefaults for RedisSettings {
    fn with_defaults() -> Self {
        Self::default()
    }
}

impl RedisSettings {
    /// Connect/read/write timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Client connection record for one logical database on this server.
    ///
    /// The database index is not range-checked here; the server rejects an
    /// out-of-range index when the connection issues `SELECT`.
    pub fn connection_info(&self, database: u32) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: i64::from(database),
                username: self.username.clone(),
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }

    /// `host:port`, used in log fields
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PoolSettings {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Validate for PoolSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active == 0 {
            return Err(ConfigError::ValidationError("pool.max_active must be > 0".to_string()));
        }
        if self.max_idle > self.max_active {
            return Err(ConfigError::ValidationError(format!(
                "pool.max_idle ({}) cannot exceed pool.max_active ({})",
                self.max_idle, self.max_active
            )));
        }
        if self.min_idle > self.max_idle {
            return Err(ConfigError::ValidationError(format!(
                "pool.min_idle ({}) cannot exceed pool.max_idle ({})",
                self.min_idle, self.max_idle
            )));
        }
        if self.max_wait == 0 {
            return Err(ConfigError::ValidationError("pool.max_wait must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Validate for RedisSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError("host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::ValidationError("port must be > 0".to_string()));
        }
        if self.timeout == 0 {
            return Err(ConfigError::ValidationError("timeout must be > 0".to_string()));
        }
        self.pool.validate()
    }
}
