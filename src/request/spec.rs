use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::escape::{escape, unescape};
use super::proxy::ProxyConfig;
use crate::error::{EngineError, Result};
use crate::identity::ClientIdentity;

/// Editable field values of a request, as bound to a form or preset.
///
/// `payload` holds plain (unescaped) text. This is the only mutable shape of a
/// request; turn it into a [`RequestSpec`] with [`RequestSpec::from_fields`].
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestFields {
    pub endpoint: String,
    #[serde(default)]
    pub payload: String,
    pub method: String,
    pub content_type: String,
    #[serde(default)]
    pub base64: bool,
    #[serde(default)]
    pub http_user: String,
    #[serde(default)]
    pub http_password: String,
}

impl fmt::Debug for RequestFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFields")
            .field("endpoint", &self.endpoint)
            .field("payload", &self.payload)
            .field("method", &self.method)
            .field("content_type", &self.content_type)
            .field("base64", &self.base64)
            .field("http_user", &self.http_user)
            .field("http_password", &redact(&self.http_password))
            .finish()
    }
}

/// Immutable description of one HTTP request.
///
/// Equality and hashing cover the request content only: endpoint, payload,
/// method, content type, base64 flag and basic-auth credentials. Timeout,
/// proxy and client identity are session parameters and never take part, so
/// the same request sent through two proxies is still the same request.
#[derive(Clone)]
pub struct RequestSpec {
    endpoint: String,
    uri: Option<Url>,
    /// Escaped storage form
    payload: String,
    method: String,
    content_type: String,
    base64: bool,
    http_user: String,
    http_password: String,

    timeout_seconds: u32,
    proxy: Option<ProxyConfig>,
    identity: Option<Arc<ClientIdentity>>,
}

impl RequestSpec {
    /// Build a spec from raw field values.
    ///
    /// An endpoint that does not parse as a URL is kept as-is and leaves
    /// [`uri`](Self::uri) empty; it is rejected later by
    /// [`validate`](Self::validate).
    pub fn new(
        endpoint: impl Into<String>,
        payload: &str,
        method: impl Into<String>,
        content_type: impl Into<String>,
        base64: bool,
        http_user: impl Into<String>,
        http_password: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        let uri = parse_endpoint(&endpoint);

        Self {
            endpoint,
            uri,
            payload: escape(payload).into_owned(),
            method: method.into(),
            content_type: content_type.into(),
            base64,
            http_user: http_user.into(),
            http_password: http_password.into(),
            timeout_seconds: 0,
            proxy: None,
            identity: None,
        }
    }

    pub fn from_fields(fields: RequestFields) -> Self {
        Self::new(
            fields.endpoint,
            &fields.payload,
            fields.method,
            fields.content_type,
            fields.base64,
            fields.http_user,
            fields.http_password,
        )
    }

    /// Rebuild a spec whose payload is in escaped storage form, as returned
    /// by [`payload_raw`](Self::payload_raw).
    ///
    /// [`from_fields`](Self::from_fields) expects plain text and would escape
    /// a stored payload a second time.
    pub fn from_stored(fields: RequestFields) -> Self {
        let payload = unescape(&fields.payload).into_owned();
        Self::from_fields(RequestFields { payload, ..fields })
    }

    /// Current field values, payload unescaped
    pub fn to_fields(&self) -> RequestFields {
        RequestFields {
            endpoint: self.endpoint.clone(),
            payload: self.payload().into_owned(),
            method: self.method.clone(),
            content_type: self.content_type.clone(),
            base64: self.base64,
            http_user: self.http_user.clone(),
            http_password: self.http_password.clone(),
        }
    }

    /// Independent copy with identical field values
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Copy the spec, apply `edit` to its field values and rebuild.
    ///
    /// Session parameters (timeout, proxy, identity) carry over.
    pub fn copy_with(&self, edit: impl FnOnce(&mut RequestFields)) -> Self {
        let mut fields = self.to_fields();
        edit(&mut fields);

        Self {
            timeout_seconds: self.timeout_seconds,
            proxy: self.proxy.clone(),
            identity: self.identity.clone(),
            ..Self::from_fields(fields)
        }
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Attach a proxy; a proxy without a host is dropped
    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy.filter(ProxyConfig::is_enabled);
        self
    }

    pub fn with_identity(mut self, identity: Option<Arc<ClientIdentity>>) -> Self {
        self.identity = identity;
        self
    }

    /// True when endpoint, method and content type are all non-blank
    pub fn is_actionable(&self) -> bool {
        [&self.endpoint, &self.method, &self.content_type]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// Gate applied before a request may be fired.
    ///
    /// Returns the absolute `http`/`https` URL to call.
    pub fn validate(&self) -> Result<Url> {
        if !self.is_actionable() {
            return Err(EngineError::NotActionable);
        }

        let malformed = |reason: String| EngineError::MalformedEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };

        let url = Url::parse(self.endpoint.trim()).map_err(|e| malformed(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(malformed(format!("unsupported scheme '{other}'"))),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Parsed endpoint, if it was a valid URL at construction
    pub fn uri(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    /// Payload text as entered
    pub fn payload(&self) -> std::borrow::Cow<'_, str> {
        unescape(&self.payload)
    }

    /// Payload in escaped storage form, for handing to a preset store.
    ///
    /// Load it back with [`from_stored`](Self::from_stored).
    pub fn payload_raw(&self) -> &str {
        &self.payload
    }

    /// Body as it goes on the wire: base64 encoded when requested
    pub fn transmitted_body(&self) -> String {
        let payload = self.payload();
        if self.base64 {
            BASE64_STANDARD.encode(payload.as_bytes())
        } else {
            payload.into_owned()
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn base64(&self) -> bool {
        self.base64
    }

    pub fn http_user(&self) -> &str {
        &self.http_user
    }

    pub fn http_password(&self) -> &str {
        &self.http_password
    }

    /// Request timeout in seconds, 0 for none
    pub fn timeout_seconds(&self) -> u32 {
        self.timeout_seconds
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    pub fn identity(&self) -> Option<&Arc<ClientIdentity>> {
        self.identity.as_ref()
    }
}

fn parse_endpoint(endpoint: &str) -> Option<Url> {
    match Url::parse(endpoint.trim()) {
        Ok(url) => Some(url),
        Err(e) => {
            debug!(endpoint, error = %e, "Bad endpoint");
            None
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "***" }
}

impl PartialEq for RequestSpec {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint
            && self.payload() == other.payload()
            && self.method == other.method
            && self.content_type == other.content_type
            && self.base64 == other.base64
            && self.http_user == other.http_user
            && self.http_password == other.http_password
    }
}

impl Eq for RequestSpec {}

impl Hash for RequestSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint.hash(state);
        self.payload().hash(state);
        self.method.hash(state);
        self.content_type.hash(state);
        self.base64.hash(state);
        self.http_user.hash(state);
        self.http_password.hash(state);
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.method, self.endpoint, self.content_type)
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("endpoint", &self.endpoint)
            .field("payload", &self.payload)
            .field("method", &self.method)
            .field("content_type", &self.content_type)
            .field("base64", &self.base64)
            .field("http_user", &self.http_user)
            .field("http_password", &redact(&self.http_password))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("proxy", &self.proxy)
            .field("identity", &self.identity.as_ref().map(|id| id.file()))
            .finish()
    }
}

impl From<RequestFields> for RequestSpec {
    fn from(fields: RequestFields) -> Self {
        Self::from_fields(fields)
    }
}
