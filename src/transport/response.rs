use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;

use super::{DecodeError, RawResponse, ResponseText};

/// Fully received HTTP response, kept as bytes until decoded
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub version: String,
    pub reason: Option<String>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Bytes,
}

impl HttpResponse {
    /// `HTTP/1.1` response with the given status and body
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            version: "HTTP/1.1".to_string(),
            reason: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        self.headers.push((name.into(), value.as_ref().to_vec()));
        self
    }

    fn content_type(&self) -> Option<mime::Mime> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .and_then(|(_, value)| std::str::from_utf8(value).ok())
            .and_then(|value| value.parse().ok())
    }

    /// Status line plus one `name: value` line per header, in received order.
    ///
    /// Values that are not UTF-8 are read as Latin-1 (obs-text), so this never
    /// fails.
    fn decode_headers(&self) -> String {
        let mut text = format!("{} {}", self.version, self.status);
        if let Some(reason) = &self.reason {
            text.push(' ');
            text.push_str(reason);
        }

        for (name, value) in &self.headers {
            text.push('\n');
            text.push_str(name);
            text.push_str(": ");
            text.push_str(&header_text(value));
        }

        text
    }

    /// Body text in the declared charset, UTF-8 when none is declared or the
    /// label is unknown. A byte order mark overrides the declaration.
    fn decode_body(&self) -> Result<String, DecodeError> {
        let declared = self
            .content_type()
            .and_then(|mime| mime.get_param(mime::CHARSET).map(|c| c.as_str().to_string()));

        let encoding = declared
            .as_deref()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);

        let (encoding, bom_len) = Encoding::for_bom(&self.body).unwrap_or((encoding, 0));

        encoding
            .decode_without_bom_handling_and_without_replacement(&self.body[bom_len..])
            .map(Cow::into_owned)
            .ok_or_else(|| DecodeError::Body {
                charset: encoding.name().to_string(),
                reason: "malformed byte sequence".to_string(),
            })
    }
}

fn header_text(value: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(value) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(value.iter().map(|&b| char::from(b)).collect()),
    }
}

impl RawResponse for HttpResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn decode(&self) -> ResponseText {
        ResponseText {
            headers: self.decode_headers(),
            body: self.decode_body(),
        }
    }
}
