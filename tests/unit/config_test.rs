//! Unit tests for Redis configuration loading
//!
//! - Loading config/default.toml
//! - Environment-specific file overrides
//! - Environment variable precedence
//! - Validation of loaded values

use lighter_redis::config::*;
use serial_test::serial;
use std::env;
use std::path::Path;

mod utils {
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Create a fresh config directory for one test
    pub fn temp_config_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lighter-redis-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn write_config(dir: &Path, file: &str, content: &str) {
        fs::write(dir.join(file), content).unwrap();
    }

    pub fn remove_dir(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    /// Clean up environment variables with LIGHTER_REDIS prefix
    pub fn clean_env_vars() {
        let keys: Vec<String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("LIGHTER_REDIS"))
            .map(|(k, _)| k)
            .collect();

        for key in keys {
            unsafe { std::env::remove_var(&key) };
        }
    }
}

fn empty_dir_loader(dir: &Path) -> ConfigLoader {
    ConfigLoader::new()
        .with_directory(dir)
        .with_environment("test")
}

// =============================================================================
// Test 1: Loading Default Configuration
// =============================================================================

#[test]
#[serial]
fn test_load_default_config_success() {
    utils::clean_env_vars();
    unsafe { env::remove_var("APP_ENV") };

    // Reads config/default.toml from the crate root
    let settings = load();
    assert!(settings.is_ok(), "Failed to load default configuration: {:?}", settings.err());

    let settings = settings.unwrap();
    assert_eq!(settings.host, "localhost");
    assert_eq!(settings.port, 6379);
    assert_eq!(settings.timeout, 2000);
    assert_eq!(settings.pool.max_active, 8);
    assert_eq!(settings.pool.max_idle, 8);
    assert_eq!(settings.pool.min_idle, 0);
    assert_eq!(settings.pool.max_wait, 30_000);
}

#[test]
#[serial]
fn test_missing_files_fall_back_to_defaults() {
    utils::clean_env_vars();
    let dir = utils::temp_config_dir("missing");

    let settings = empty_dir_loader(&dir).load().unwrap();
    assert_eq!(settings, RedisSettings::with_defaults());

    utils::remove_dir(&dir);
}

// =============================================================================
// Test 2: Environment-Specific Overrides
// =============================================================================

#[test]
#[serial]
fn test_environment_file_overrides_default() {
    utils::clean_env_vars();
    let dir = utils::temp_config_dir("environment");
    utils::write_config(
        &dir,
        "default.toml",
        "host = \"redis.internal\"\n[pool]\nmax_active = 16\nmax_idle = 8\n",
    );
    utils::write_config(&dir, "staging.toml", "port = 6380\n[pool]\nmax_active = 32\n");

    let settings = ConfigLoader::new()
        .with_directory(&dir)
        .with_environment("staging")
        .load()
        .unwrap();

    assert_eq!(settings.host, "redis.internal");
    assert_eq!(settings.port, 6380);
    assert_eq!(settings.pool.max_active, 32);
    assert_eq!(settings.pool.max_idle, 8);

    utils::remove_dir(&dir);
}

#[test]
#[serial]
fn test_local_file_overrides_environment_file() {
    utils::clean_env_vars();
    let dir = utils::temp_config_dir("local");
    utils::write_config(&dir, "test.toml", "host = \"from-env-file\"\n");
    utils::write_config(&dir, "local.toml", "host = \"from-local-file\"\n");

    let settings = empty_dir_loader(&dir).load().unwrap();
    assert_eq!(settings.host, "from-local-file");

    utils::remove_dir(&dir);
}

// =============================================================================
// Test 3: Environment Variable Override
// =============================================================================

#[test]
#[serial]
fn test_environment_variable_override() {
    utils::clean_env_vars();
    let dir = utils::temp_config_dir("env-vars");
    utils::write_config(&dir, "default.toml", "host = \"from-file\"\nport = 6390\n");

    unsafe {
        env::set_var("LIGHTER_REDIS__HOST", "from-env");
        env::set_var("LIGHTER_REDIS__PASSWORD", "s3cret");
        env::set_var("LIGHTER_REDIS__POOL__MAX_ACTIVE", "16");
    }

    let settings = empty_dir_loader(&dir).load().unwrap();

    assert_eq!(settings.host, "from-env", "Host should be overridden by env var");
    assert_eq!(settings.port, 6390, "Port should come from the file");
    assert_eq!(settings.password.as_deref(), Some("s3cret"));
    assert_eq!(settings.pool.max_active, 16);

    utils::clean_env_vars();
    utils::remove_dir(&dir);
}

#[test]
#[serial]
fn test_loader_rereads_sources_on_every_call() {
    utils::clean_env_vars();
    let dir = utils::temp_config_dir("reread");
    let loader = empty_dir_loader(&dir);

    assert_eq!(loader.redis_settings().unwrap().port, 6379);

    utils::write_config(&dir, "default.toml", "port = 7000\n");
    assert_eq!(loader.redis_settings().unwrap().port, 7000);

    utils::remove_dir(&dir);
}

// =============================================================================
// Test 4: Validation
// =============================================================================

#[test]
#[serial]
fn test_invalid_file_values_are_rejected() {
    utils::clean_env_vars();
    let dir = utils::temp_config_dir("invalid");
    utils::write_config(&dir, "default.toml", "[pool]\nmax_active = 4\nmax_idle = 8\n");

    let result = empty_dir_loader(&dir).load();

    if let Err(ConfigError::ValidationError(msg)) = result {
        assert!(msg.contains("max_idle"));
    } else {
        panic!("Expected ValidationError for max_idle above max_active");
    }

    utils::remove_dir(&dir);
}

#[test]
#[serial]
fn test_malformed_values_are_load_errors() {
    utils::clean_env_vars();
    let dir = utils::temp_config_dir("malformed");
    utils::write_config(&dir, "default.toml", "port = \"not-a-port\"\n");

    let result = empty_dir_loader(&dir).load();
    assert!(matches!(result, Err(ConfigError::Load(_))));

    utils::remove_dir(&dir);
}

#[test]
fn test_validation_zero_timeout() {
    let mut settings = RedisSettings::with_defaults();
    settings.timeout = 0;

    if let Err(ConfigError::ValidationError(msg)) = settings.validate() {
        assert!(msg.contains("timeout"));
    } else {
        panic!("Expected ValidationError for zero timeout");
    }
}

#[test]
fn test_validation_min_idle_equal_to_max_idle_is_allowed() {
    let mut settings = RedisSettings::with_defaults();
    settings.pool.min_idle = settings.pool.max_idle;

    assert!(settings.validate().is_ok());
}
