//! Configuration management for postbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use postbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("User agent: {}", config.client.user_agent);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `POSTBOX__<section>__<key>`
//!
//! Examples:
//! - `POSTBOX__CLIENT__CONNECT_TIMEOUT_SECS=5`
//! - `POSTBOX__REQUEST__DEFAULT_TIMEOUT_SECS=0`
//! - `POSTBOX__PROXY__HOST=proxy.internal`
//!
//! The proxy password can also be supplied as `POSTBOX_PROXY_PASSWORD`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/postbox.toml`.
//! This can be overridden using the `POSTBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{ClientConfig, Config, RequestDefaults};
pub use validation::ValidationError;

use thiserror::Error;

use crate::request::ProxyConfig;
use crate::transport::HttpConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`POSTBOX__*`)
    /// 2. TOML file (default: `config/postbox.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (bad method, MIME type or proxy port)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Settings for the HTTP transport
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::from(&self.client)
    }

    /// Default proxy, if one is configured
    pub fn default_proxy(&self) -> Option<ProxyConfig> {
        Some(self.proxy.clone()).filter(ProxyConfig::is_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[request]
default_timeout_secs = 5
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.request.default_timeout_secs, 5);
        assert!(config.default_proxy().is_none());
    }

    #[test]
    fn test_validation_catches_bad_proxy() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[proxy]
host = "proxy.local"
port = "nope"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InvalidProxy(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "[client\nuser_agent = ").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::LoadError(_)));
    }

    #[test]
    fn test_full_config_example() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[client]
user_agent = "postbox-ci/1.0"
connect_timeout_secs = 2
max_redirects = 5

[request]
default_timeout_secs = 60
default_method = "PUT"
default_content_type = "application/xml"

[proxy]
host = "proxy.corp"
port = "3128"
user = "build"
password = "hunter2"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();

        let http = config.http_config();
        assert_eq!(http.user_agent, "postbox-ci/1.0");
        assert_eq!(http.connect_timeout, Duration::from_secs(2));
        assert_eq!(http.max_redirects, 5);

        assert_eq!(config.request.default_method, "PUT");

        let proxy = config.default_proxy().unwrap();
        assert_eq!(proxy.credentials(), Some(("build", "hunter2")));
    }
}
