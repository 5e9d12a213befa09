use crate::config::ClientConfig;
use crate::cookies::{Cookie, CookieJarHandle, DefaultCookieJar};
use crate::errors::Result;
use crate::executor;
use crate::request::Request;
use crate::response::RawResponse;
use crate::transport::{ReqwestTransport, Transport};
use http::Method;
use std::sync::{Arc, PoisonError};
use url::Url;

/// Entry point for executing requests.
///
/// A session carries the default configuration, the cookie jar shared by all its requests and
/// the transport. Cloning is cheap and clones share the same jar, so a session can be handed to
/// other threads.
#[derive(Clone)]
pub struct Session {
    config: Arc<ClientConfig>,        // Defaults for new requests
    jar: CookieJarHandle,             // Cookies observed on any hop of any request
    transport: Arc<dyn Transport>,    // Connection primitive
}

impl Session {
    /// Creates a session with an empty in-memory jar and the reqwest transport. Can use None when
    /// using the default configuration.
    pub fn new(config: Option<ClientConfig>) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Creates a session that executes its exchanges through `transport`
    pub fn with_transport(config: Option<ClientConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config.unwrap_or_default()),
            jar: DefaultCookieJar::handle(),
            transport,
        }
    }

    /// Replaces the cookie jar, e.g. to share one jar between sessions
    pub fn with_cookie_jar(mut self, jar: CookieJarHandle) -> Self {
        self.jar = jar;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cookie_jar(&self) -> CookieJarHandle {
        self.jar.clone()
    }

    /// Snapshot of all cookies currently in the jar
    pub fn cookies(&self) -> Vec<Cookie> {
        self.jar.read().unwrap_or_else(PoisonError::into_inner).all()
    }

    /// Creates a request for `url` with the session defaults
    pub fn request(&self, method: Method, url: &str) -> Result<Request> {
        let url = Url::parse(url)?;
        Ok(Request::with_config(method, url, &self.config))
    }

    pub fn get(&self, url: &str) -> Result<Request> {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> Result<Request> {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> Result<Request> {
        self.request(Method::PUT, url)
    }

    pub fn delete(&self, url: &str) -> Result<Request> {
        self.request(Method::DELETE, url)
    }

    pub fn head(&self, url: &str) -> Result<Request> {
        self.request(Method::HEAD, url)
    }

    /// Executes `request`, following redirects when the request asks for it.
    ///
    /// The returned response owns the connection until one of its terminal operations runs or
    /// it is dropped.
    pub fn send(&self, request: Request) -> Result<RawResponse> {
        executor::proceed(self.transport.as_ref(), &self.jar, request)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("config", &self.config).finish_non_exhaustive()
    }
}
