pub mod provider;
pub mod settings;

use thiserror::Error;

pub use provider::{ConfigLoader, SettingsProvider};
pub use settings::{PoolSettings, RedisSettings};

/// Configuration loading or validation failure
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration source could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// The loaded values are out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Validation of a loaded configuration section
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Construction of a configuration section from built-in defaults only
pub trait WithDefaults {
    fn with_defaults() -> Self;
}

/// Load the Redis settings from files and environment variables
pub fn load() -> Result<RedisSettings, ConfigError> {
    ConfigLoader::new().load()
}
