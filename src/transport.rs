//! Connection primitive.
//!
//! A [`Transport`] performs one physical request/response exchange and hands back the response
//! head plus an unread body stream. It must not follow redirects nor decode
//! `Content-Encoding`: both are handled by the executor so cookies and header policy stay
//! consistent across hops. Dropping the body stream releases the connection.

mod reqwest_transport;
#[cfg(test)]
pub(crate) mod testing;

pub use reqwest_transport::ReqwestTransport;

use crate::compression::BodyReader;
use crate::errors::Result;
use crate::headers::Headers;
use crate::request::Proxy;
use http::Method;
use std::time::Duration;
use url::Url;

/// How server certificates are checked on encrypted connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Platform defaults
    Platform,
    /// Accept every certificate
    TrustAll,
    /// Trust exactly these PEM encoded certificates
    Custom(Vec<Vec<u8>>),
}

impl TrustPolicy {
    /// A custom policy is only used when verification is off or certificates were supplied.
    pub fn from_request(verify: bool, trusted_certs: &[Vec<u8>]) -> Self {
        if !verify {
            TrustPolicy::TrustAll
        } else if !trusted_certs.is_empty() {
            TrustPolicy::Custom(trusted_certs.to_vec())
        } else {
            TrustPolicy::Platform
        }
    }
}

/// A fully prepared request, ready to go over the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    /// Final header set; the transport must not add `Accept-Encoding` or cookies of its own
    pub headers: Headers,
    /// Encoded body
    pub body: Option<Vec<u8>>,
    pub proxy: Option<Proxy>,
    pub trust: TrustPolicy,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub keep_alive: bool,
}

/// Response head and the raw (still encoded) body of one exchange.
pub struct TransportResponse {
    pub status: u16,
    pub status_line: String,
    /// All header lines in wire order, duplicates included
    pub headers: Headers,
    /// The regular body stream, `None` when the connection offers none
    pub body: Option<BodyReader>,
    /// Fallback stream for error statuses
    pub error_body: Option<BodyReader>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_line", &self.status_line)
            .field("headers", &self.headers)
            .field("body", &self.body.is_some())
            .field("error_body", &self.error_body.is_some())
            .finish()
    }
}

/// Executes a single exchange. Implementations must be usable from several threads.
pub trait Transport: Send + Sync {
    fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;
}
