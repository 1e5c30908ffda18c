use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ConfigError, RedisSettings, Validate};

/// Source of Redis settings, consulted every time a new pool is built
///
/// Implementations must return freshly validated settings on each call so
/// that configuration changes apply to pools created afterwards.
pub trait SettingsProvider: Send + Sync {
    fn redis_settings(&self) -> Result<RedisSettings, ConfigError>;
}

/// Fixed settings, validated on every call
impl SettingsProvider for RedisSettings {
    fn redis_settings(&self) -> Result<RedisSettings, ConfigError> {
        self.validate()?;
        Ok(self.clone())
    }
}

impl<T: SettingsProvider + ?Sized> SettingsProvider for Arc<T> {
    fn redis_settings(&self) -> Result<RedisSettings, ConfigError> {
        (**self).redis_settings()
    }
}

/// Layered settings loader backed by the `config` crate
///
/// Configuration loading follows this precedence (highest to lowest):
/// 1. Environment variables: LIGHTER_REDIS__HOST, LIGHTER_REDIS__POOL__MAX_ACTIVE=16
/// 2. {directory}/local.toml (git-ignored, developer overrides)
/// 3. {directory}/{APP_ENV}.toml (development/staging/production)
/// 4. {directory}/default.toml (base defaults)
///
/// Every source is optional; missing keys fall back to the serde defaults.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    directory: PathBuf,
    environment: Option<String>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            directory: PathBuf::from("config"),
            environment: None,
            env_prefix: "LIGHTER_REDIS".to_string(),
        }
    }

    /// Directory holding `default.toml`, `{env}.toml` and `local.toml`
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Fix the environment name instead of reading `APP_ENV`
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn environment(&self) -> String {
        self.environment
            .clone()
            .or_else(|| std::env::var("APP_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    /// Read and validate the settings from all sources
    #[tracing::instrument(skip(self), fields(directory = %self.directory.display()))]
    pub fn load(&self) -> Result<RedisSettings, ConfigError> {
        use ::config::{Config, Environment, File};

        let env = self.environment();
        let file = |name: &str| {
            File::with_name(&self.directory.join(name).to_string_lossy()).required(false)
        };

        let config = Config::builder()
            // Layer 1: Base defaults
            .add_source(file("default"))
            // Layer 2: Environment-specific overrides
            .add_source(file(&env))
            // Layer 3: Local developer overrides (git-ignored)
            .add_source(file("local"))
            // Layer 4: Environment variables (highest precedence)
            .add_source(Environment::with_prefix(&self.env_prefix).separator("__"))
            .build()?;

        let settings: RedisSettings = config.try_deserialize()?;

        if let Err(error) = settings.validate() {
            tracing::error!(environment = %env, error = %error, "Rejected Redis configuration");
            return Err(error);
        }

        tracing::debug!(
            environment = %env,
            address = %settings.address(),
            max_active = settings.pool.max_active,
            "Loaded Redis configuration"
        );

        Ok(settings)
    }
}

/// Re-reads every source on each call
impl SettingsProvider for ConfigLoader {
    fn redis_settings(&self) -> Result<RedisSettings, ConfigError> {
        self.load()
    }
}
