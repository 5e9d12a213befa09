//! Blocking HTTP client layer.
//!
//! A [`Session`] mints [`Request`]s from its [`ClientConfig`], executes them through a
//! [`Transport`](transport::Transport) and hands back a [`RawResponse`] whose body the caller
//! consumes exactly once. Cookies observed on any hop land in the session's cookie jar,
//! redirects are followed by the executor and gzip/deflate bodies are decoded on the fly.

pub mod body;
pub mod charset;
pub mod compression;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod executor;
pub mod headers;
pub mod json;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

pub use body::Body;
pub use config::{ClientConfig, DEFAULT_USER_AGENT};
pub use cookies::{Cookie, CookieJar, CookieJarHandle, DefaultCookieJar};
pub use errors::{RequestError, Result};
pub use headers::Headers;
pub use request::{BasicAuth, Proxy, Request};
pub use response::{RawResponse, Response};
pub use session::Session;
