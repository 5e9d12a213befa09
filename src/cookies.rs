//! Cookies: the [`Cookie`] record, `Set-Cookie` parsing and the [`CookieJar`] contract.
//!
//! A session owns exactly one jar, shared between threads as a [`CookieJarHandle`]. The
//! dispatcher asks the jar for matching cookies before each hop and merges the cookies parsed
//! from the response right after it, whether or not the surrounding redirect chain succeeds.

mod cookie;
mod cookie_jar;

pub use cookie::{domain_match, path_match, Cookie};
pub use cookie_jar::{CookieJar, CookieJarHandle, DefaultCookieJar};

/// Derives the default cookie path of a request path (RFC 6265, section 5.1.4).
///
/// The path is truncated at its last `/`; paths that are empty, relative or have a single
/// leading slash map to `/`. The query string must already be stripped.
pub fn effective_path(path: &str) -> &str {
    if !path.starts_with('/') {
        return "/";
    }
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}
