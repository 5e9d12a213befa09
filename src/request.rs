//! Request descriptor.
//!
//! A [`Request`] is plain data: the session fills it from its [`ClientConfig`], the caller
//! adjusts the public fields, and [`Session::send`](crate::Session::send) takes it by value.
//! Nothing on the execution path mutates it.

use crate::body::Body;
use crate::charset::encoding_for_label;
use crate::config::ClientConfig;
use crate::headers::Headers;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use encoding_rs::{Encoding, UTF_8};
use http::Method;
use std::time::Duration;
use url::Url;

/// Credentials for HTTP basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Header value: `Basic base64(user:password)`.
    pub fn encode(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", self.user, self.password)))
    }
}

/// An HTTP proxy, optionally requiring basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub auth: Option<BasicAuth>,
}

impl Proxy {
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// `http://host:port`
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Everything needed to execute one request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    /// Custom headers, applied after the generated ones
    pub headers: Headers,
    /// Cookies sent before the cookies found in the session jar
    pub cookies: Vec<(String, String)>,
    pub body: Option<Body>,
    pub proxy: Option<Proxy>,
    pub basic_auth: Option<BasicAuth>,
    pub user_agent: String,
    /// When false, certificates are not verified at all
    pub verify: bool,
    /// PEM encoded certificates to trust instead of the platform roots
    pub trusted_certs: Vec<Vec<u8>>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub follow_redirect: bool,
    pub keep_alive: bool,
    pub compress: bool,
    /// Charset used to encode text bodies
    pub charset: &'static Encoding,
}

impl Request {
    /// Creates a request with the library defaults.
    pub fn new(method: Method, url: Url) -> Self {
        Self::with_config(method, url, &ClientConfig::default())
    }

    /// Creates a request using the defaults of `config`.
    ///
    /// An unknown charset label in the configuration falls back to UTF-8.
    pub fn with_config(method: Method, url: Url, config: &ClientConfig) -> Self {
        let charset = encoding_for_label(&config.charset).unwrap_or_else(|| {
            log::warn!("unknown request charset '{}', using utf-8", config.charset);
            UTF_8
        });

        Self {
            method,
            url,
            headers: Headers::new(),
            cookies: Vec::new(),
            body: None,
            proxy: None,
            basic_auth: None,
            user_agent: config.user_agent.clone(),
            verify: config.verify,
            trusted_certs: Vec::new(),
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            follow_redirect: config.follow_redirect,
            keep_alive: config.keep_alive,
            compress: config.compress,
            charset,
        }
    }

    /// Derives the request for a redirect hop: a bodyless GET to `url` that keeps the proxy and
    /// the connection settings of `self` but none of its headers, cookies or credentials.
    pub(crate) fn redirect_to(&self, url: Url) -> Request {
        Request {
            method: Method::GET,
            url,
            headers: Headers::new(),
            cookies: Vec::new(),
            body: None,
            proxy: self.proxy.clone(),
            basic_auth: None,
            user_agent: self.user_agent.clone(),
            verify: self.verify,
            trusted_certs: self.trusted_certs.clone(),
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            follow_redirect: false,
            keep_alive: self.keep_alive,
            compress: self.compress,
            charset: self.charset,
        }
    }
}
