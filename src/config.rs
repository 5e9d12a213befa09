use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "GosubNet/0.1 (+https://gosub.io) gosub-net/0.1";

/// Defaults applied to every request minted by a [`Session`](crate::Session).
///
/// Redirect hops re-use the transport related settings of the request that started the chain,
/// so these values only matter for requests created through the session helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// User agent string, an empty string suppresses the header
    pub user_agent: String,
    /// Timeout for establishing a connection. Zero disables the timeout.
    pub connect_timeout: Duration,
    /// Timeout for reading the response. Zero disables the timeout.
    pub read_timeout: Duration,
    /// Label of the charset used for request bodies (e.g. `utf-8`, `iso-8859-1`)
    pub charset: String,
    /// Send `Accept-Encoding: gzip, deflate` and decode compressed responses
    pub compress: bool,
    /// Follow 3xx responses (bounded, see the executor)
    pub follow_redirect: bool,
    /// When false, every request carries `Connection: close`
    pub keep_alive: bool,
    /// Verify server certificates against the platform roots
    pub verify: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(10),
            charset: "utf-8".to_string(),
            compress: true,
            follow_redirect: true,
            keep_alive: true,
            verify: true,
        }
    }
}
