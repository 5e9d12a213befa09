//! Redirect following.

use crate::cookies::{Cookie, CookieJarHandle};
use crate::errors::{RequestError, Result};
use crate::executor::dispatch;
use crate::request::Request;
use crate::response::RawResponse;
use crate::transport::Transport;
use http::header::LOCATION;

/// Extra hops followed after the initial exchange.
pub const MAX_REDIRECTS: usize = 5;

/// Statuses that carry a `Location` to follow.
pub fn is_redirect(status: u16) -> bool {
    matches!(status, 300 | 301 | 302 | 303 | 307 | 308)
}

/// Executes `request` and, when it asks for it, follows redirects.
///
/// Every hop is a bodyless GET built from the first request's connection settings. Only
/// cookies travel between hops, through the jar. The body of each intermediate response is
/// drained and released before the next hop starts, so at most one connection is open at a time.
pub(crate) fn proceed(transport: &dyn Transport, jar: &CookieJarHandle, request: Request) -> Result<RawResponse> {
    let follow = request.follow_redirect;
    let mut current = request;
    let mut earlier: Vec<Cookie> = Vec::new();
    let mut redirects = 0;

    loop {
        let response = RawResponse::from_envelope(dispatch(transport, jar, &current)?);
        let status = response.status_code();

        if !follow || !is_redirect(status) {
            return Ok(response.with_earlier_cookies(earlier));
        }
        if redirects == MAX_REDIRECTS {
            log::warn!("giving up on {} after {} redirects", current.url, MAX_REDIRECTS);
            return Err(RequestError::TooManyRedirects);
        }

        let location = response
            .first_header(LOCATION.as_str())
            .ok_or(RequestError::RedirectLocationNotFound)?;
        let next = current.url.join(location).map_err(RequestError::RedirectUrl)?;
        log::debug!("{} {} redirects to {}", status, current.url, next);

        earlier.extend_from_slice(response.cookies());
        response.discard_body()?;

        current = current.redirect_to(next);
        redirects += 1;
    }
}
