use serde::{Deserialize, Serialize};
use std::fmt;

/// Proxy endpoint attached to a request at fire time.
///
/// All fields are optional. A blank or absent host means "no proxy"; the
/// port defaults to 80 when the host is set but the port is not.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

const DEFAULT_PROXY_PORT: u16 = 80;

impl ProxyConfig {
    /// Proxy with only a host and port
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port.into()),
            ..Default::default()
        }
    }

    /// Attach basic credentials for the proxy
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        non_blank(&self.host).is_some()
    }

    /// Proxy URL as `http://host:port`, or `None` when no proxy is configured.
    ///
    /// Fails when the port is not a valid non-zero TCP port.
    pub fn proxy_url(&self) -> Result<Option<String>, String> {
        let Some(host) = non_blank(&self.host) else {
            return Ok(None);
        };

        let port = match non_blank(&self.port) {
            Some(port) => port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| format!("invalid proxy port '{port}'"))?,
            None => DEFAULT_PROXY_PORT,
        };

        let host = host
            .strip_prefix("http://")
            .unwrap_or(host)
            .trim_end_matches('/');

        Ok(Some(format!("http://{host}:{port}")))
    }

    /// Credentials, when a proxy user is set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = non_blank(&self.user)?;
        Some((user, self.password.as_deref().unwrap_or("")))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_host_disables_proxy() {
        assert!(!ProxyConfig::default().is_enabled());

        let proxy = ProxyConfig {
            host: Some("   ".to_string()),
            port: Some("8080".to_string()),
            ..Default::default()
        };
        assert!(!proxy.is_enabled());
        assert_eq!(proxy.proxy_url().unwrap(), None);
    }

    #[test]
    fn test_proxy_url() {
        let proxy = ProxyConfig::new("proxy.local", "3128");
        assert_eq!(proxy.proxy_url().unwrap().as_deref(), Some("http://proxy.local:3128"));

        let proxy = ProxyConfig::new("http://proxy.local/", " 8080 ");
        assert_eq!(proxy.proxy_url().unwrap().as_deref(), Some("http://proxy.local:8080"));
    }

    #[test]
    fn test_proxy_default_port() {
        let proxy = ProxyConfig {
            host: Some("proxy.local".to_string()),
            ..Default::default()
        };
        assert_eq!(proxy.proxy_url().unwrap().as_deref(), Some("http://proxy.local:80"));
    }

    #[test]
    fn test_invalid_port() {
        assert!(ProxyConfig::new("proxy.local", "http").proxy_url().is_err());
        assert!(ProxyConfig::new("proxy.local", "0").proxy_url().is_err());
        assert!(ProxyConfig::new("proxy.local", "70000").proxy_url().is_err());
    }

    #[test]
    fn test_credentials() {
        let proxy = ProxyConfig::new("proxy.local", "3128");
        assert_eq!(proxy.credentials(), None);

        let proxy = proxy.with_credentials("alice", "s3cret");
        assert_eq!(proxy.credentials(), Some(("alice", "s3cret")));
        assert!(!format!("{proxy:?}").contains("s3cret"));
    }
}
