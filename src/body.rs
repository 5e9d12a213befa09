//! Request bodies.
//!
//! Every body variant answers the same three questions for the dispatcher: which
//! `Content-Type` to announce, whether the request charset belongs in that header, and how to
//! write itself to the connection in a given charset.

use encoding_rs::Encoding;
use std::io::{self, Write};
use url::form_urlencoded;

#[derive(Debug, Clone)]
pub enum Body {
    /// Plain text, encoded with the request charset.
    Text(String),
    /// Raw bytes, sent as-is.
    Bytes(Vec<u8>),
    /// `application/x-www-form-urlencoded` pairs, percent-encoded from the request charset.
    Form(Vec<(String, String)>),
    /// A JSON document, always sent as UTF-8.
    Json(serde_json::Value),
}

impl Body {
    pub fn text(text: impl Into<String>) -> Self {
        Body::Text(text.into())
    }

    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Body::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Serializes `value` into a JSON body.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Body::Json(serde_json::to_value(value)?))
    }

    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Body::Text(_) => Some("text/plain"),
            Body::Bytes(_) => Some("application/octet-stream"),
            Body::Form(_) => Some("application/x-www-form-urlencoded"),
            Body::Json(_) => Some("application/json"),
        }
    }

    /// Whether `; charset=<name>` should follow the content type.
    pub fn include_charset(&self) -> bool {
        !matches!(self, Body::Bytes(_))
    }

    /// Writes the body to `out`, encoding text with `charset`.
    pub fn write_body(&self, out: &mut dyn Write, charset: &'static Encoding) -> io::Result<()> {
        match self {
            Body::Text(text) => {
                let (bytes, _, _) = charset.encode(text);
                out.write_all(&bytes)
            }
            Body::Bytes(bytes) => out.write_all(bytes),
            Body::Form(pairs) => {
                for (idx, (key, value)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        out.write_all(b"&")?;
                    }
                    write_form_component(out, key, charset)?;
                    out.write_all(b"=")?;
                    write_form_component(out, value, charset)?;
                }
                Ok(())
            }
            Body::Json(value) => serde_json::to_writer(out, value).map_err(io::Error::from),
        }
    }
}

fn write_form_component(out: &mut dyn Write, text: &str, charset: &'static Encoding) -> io::Result<()> {
    let (bytes, _, _) = charset.encode(text);
    for chunk in form_urlencoded::byte_serialize(&bytes) {
        out.write_all(chunk.as_bytes())?;
    }
    Ok(())
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}
