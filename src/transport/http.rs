//! reqwest-backed transport

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::debug;

use super::{
    ClientSettings, Connection, HttpResponse, OutboundRequest, RawResponse, Result, Transport,
    TransportError,
};

/// HTTP client configuration shared by every connection
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("postbox/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
        }
    }
}

/// Transport building one `reqwest::Client` per task.
///
/// Clients keep no idle connections, so nothing is reused across tasks.
/// Environment proxies are ignored; only the proxy attached to the request
/// is used.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    config: HttpConfig,
}

impl ReqwestTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

impl Transport for ReqwestTransport {
    fn prepare(&self, settings: &ClientSettings) -> Result<Box<dyn Connection>> {
        let mut builder = Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .user_agent(&self.config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(self.config.max_redirects))
            .pool_max_idle_per_host(0)
            .no_proxy();

        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        // Configure proxy if provided
        if let Some(config) = &settings.proxy {
            if let Some(url) = config.proxy_url().map_err(TransportError::ClientSetup)? {
                let mut proxy = Proxy::all(&url)
                    .map_err(|e| TransportError::ClientSetup(format!("Invalid proxy: {}", e)))?;
                if let Some((user, password)) = config.credentials() {
                    proxy = proxy.basic_auth(user, password);
                }
                debug!(proxy = %url, "Using proxy");
                builder = builder.proxy(proxy);
            }
        }

        if let Some(identity) = &settings.identity {
            let tls = identity.tls_identity().map_err(|e| {
                TransportError::ClientSetup(format!(
                    "Client certificate {} unusable: {}",
                    identity.file().display(),
                    e
                ))
            })?;
            builder = builder.use_native_tls().identity(tls);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::ClientSetup(e.to_string()))?;

        Ok(Box::new(ReqwestConnection { client }))
    }
}

struct ReqwestConnection {
    client: Client,
}

#[async_trait]
impl Connection for ReqwestConnection {
    async fn invoke(&self, request: OutboundRequest) -> Result<Box<dyn RawResponse>> {
        let url = request.url.to_string();
        debug!(url, method = %request.method, "Sending request");

        let mut builder = self.client.request(request.method, request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;

        let status = response.status();
        let version = format!("{:?}", response.version());
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        // Read response body
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e.to_string())
            }
        })?;

        debug!(url, status = status.as_u16(), size = body.len(), "Response received");

        Ok(Box::new(HttpResponse {
            status: status.as_u16(),
            version,
            reason: status.canonical_reason().map(str::to_string),
            headers,
            body,
        }))
    }

    async fn close(self: Box<Self>) {
        debug!("Closing HTTP client");
        drop(self.client);
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ProxyConfig;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 10);
        assert!(config.user_agent.starts_with("postbox/"));
    }

    #[test]
    fn test_prepare_plain_client() {
        let transport = ReqwestTransport::default();
        assert!(transport.prepare(&ClientSettings::default()).is_ok());
    }

    #[test]
    fn test_prepare_with_proxy_and_timeout() {
        let transport = ReqwestTransport::default();
        let settings = ClientSettings::builder()
            .proxy(ProxyConfig::new("proxy.local", "3128").with_credentials("alice", "pw"))
            .timeout(Duration::from_secs(3))
            .build();

        assert!(transport.prepare(&settings).is_ok());
    }

    #[test]
    fn test_prepare_rejects_bad_proxy_port() {
        let transport = ReqwestTransport::default();
        let settings = ClientSettings::builder()
            .proxy(ProxyConfig::new("proxy.local", "not-a-port"))
            .build();

        let err = transport.prepare(&settings).err().unwrap();
        assert!(matches!(err, TransportError::ClientSetup(_)));
    }
}
