//! Transport capability used by response tasks
//!
//! The engine never talks to an HTTP library directly. A [`Transport`]
//! prepares a fresh [`Connection`] per task from [`ClientSettings`]; the
//! connection performs exactly one call and is closed afterwards. Responses
//! come back as opaque [`RawResponse`] values that are decoded lazily.

mod response;
pub mod http;
pub mod stub;

pub use http::{HttpConfig, ReqwestTransport};
pub use response::HttpResponse;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::identity::ClientIdentity;
use crate::request::ProxyConfig;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("client setup failed: {0}")]
    ClientSetup(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("response body is not valid {charset}: {reason}")]
    Body { charset: String, reason: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Per-task client configuration
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct ClientSettings {
    pub proxy: Option<ProxyConfig>,
    pub identity: Option<Arc<ClientIdentity>>,
    /// Total request timeout, `None` for no limit
    pub timeout: Option<Duration>,
}

/// One HTTP call as handed to a connection
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: reqwest::Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Header and body text of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResponse {
    pub headers: String,
    pub body: String,
}

/// Text of a response as produced by [`RawResponse::decode`].
///
/// Headers always have a text form; only the body can fail to decode.
#[derive(Debug, Clone)]
pub struct ResponseText {
    pub headers: String,
    pub body: std::result::Result<String, DecodeError>,
}

/// Transport-level response, decoded on demand
pub trait RawResponse: Send + Sync + fmt::Debug {
    fn status(&self) -> u16;

    fn decode(&self) -> ResponseText;
}

/// Builds connections. Preparation is synchronous and must not touch the
/// network.
pub trait Transport: Send + Sync {
    fn prepare(&self, settings: &ClientSettings) -> Result<Box<dyn Connection>>;
}

#[async_trait]
pub trait Connection: Send + Sync {
    async fn invoke(&self, request: OutboundRequest) -> Result<Box<dyn RawResponse>>;

    /// Release the client. Called on every path once a connection exists.
    async fn close(self: Box<Self>);
}
