use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::request::ProxyConfig;
use crate::transport::HttpConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub request: RequestDefaults,
    /// Default proxy for fired requests; a blank host means no proxy
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl From<&ClientConfig> for HttpConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            user_agent: config.user_agent.clone(),
            max_redirects: config.max_redirects,
        }
    }
}

fn default_user_agent() -> String {
    concat!("postbox/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    10
}

/// Values used when a request leaves a field out
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestDefaults {
    /// Request timeout in seconds, 0 for none
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u32,
    #[serde(default = "default_method")]
    pub default_method: String,
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            default_method: default_method(),
            default_content_type: default_content_type(),
        }
    }
}

fn default_timeout_secs() -> u32 {
    30
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_content_type() -> String {
    "text/plain".to_string()
}
