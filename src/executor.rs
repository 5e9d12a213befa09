//! Request execution.
//!
//! # Data Flow
//! ```text
//! Session::send(request)
//!     → redirect::proceed   (follows up to 5 extra hops, GET only)
//!         → dispatch::dispatch   (one exchange: headers, cookies, body, decoding)
//!             → Transport::execute
//!     → RawResponse (caller consumes it exactly once)
//! ```

mod dispatch;
mod redirect;

pub(crate) use dispatch::dispatch;
pub(crate) use redirect::proceed;
pub use redirect::{is_redirect, MAX_REDIRECTS};

use crate::compression::BodyReader;
use crate::cookies::Cookie;
use crate::headers::Headers;
use url::Url;

/// Result of one hop: response head, the cookies it set, and the (decoding) body stream.
pub(crate) struct Envelope {
    pub url: Url,
    pub status: u16,
    pub status_line: String,
    pub headers: Headers,
    pub cookies: Vec<Cookie>,
    pub body: BodyReader,
}
