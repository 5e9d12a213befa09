//! A single request/response exchange.

use crate::compression;
use crate::cookies::{effective_path, Cookie, CookieJarHandle};
use crate::errors::{RequestError, Result};
use crate::executor::Envelope;
use crate::headers::Headers;
use crate::request::Request;
use crate::transport::{Transport, TransportRequest, TrustPolicy};
use http::header::{
    ACCEPT_ENCODING, AUTHORIZATION, CONNECTION, CONTENT_ENCODING, CONTENT_TYPE, COOKIE, PROXY_AUTHORIZATION,
    SET_COOKIE, USER_AGENT,
};
use std::io;
use std::sync::PoisonError;

/// Performs exactly one exchange for `request` and returns the envelope with an unread body.
///
/// Cookies set by the response are merged into `jar` before this returns, so they survive even
/// if a later hop of the same chain fails.
pub(crate) fn dispatch(transport: &dyn Transport, jar: &CookieJarHandle, request: &Request) -> Result<Envelope> {
    let url = &request.url;
    let protocol = url.scheme();
    let host = url
        .host_str()
        .ok_or_else(|| RequestError::InvalidRequest(format!("url has no host: {url}")))?;
    let cookie_path = effective_path(url.path());

    let mut headers = Headers::new();
    let mut body = None;

    if let Some(payload) = &request.body {
        if let Some(content_type) = payload.content_type() {
            let value = if payload.include_charset() {
                format!("{content_type}; charset={}", request.charset.name().to_ascii_lowercase())
            } else {
                content_type.to_string()
            };
            headers.set(CONTENT_TYPE.as_str(), value);
        }

        let mut encoded = Vec::new();
        payload.write_body(&mut encoded, request.charset)?;
        body = Some(encoded);
    }

    if !request.user_agent.is_empty() {
        headers.set(USER_AGENT.as_str(), request.user_agent.as_str());
    }
    if request.compress {
        headers.set(ACCEPT_ENCODING.as_str(), "gzip, deflate");
    }
    if let Some(auth) = &request.basic_auth {
        headers.set(AUTHORIZATION.as_str(), auth.encode());
    }
    if let Some(auth) = request.proxy.as_ref().and_then(|p| p.auth.as_ref()) {
        headers.set(PROXY_AUTHORIZATION.as_str(), auth.encode());
    }

    let cookie_header = cookie_header(request, jar, protocol, host, cookie_path);
    if !cookie_header.is_empty() {
        headers.set(COOKIE.as_str(), cookie_header);
    }

    for (name, value) in request.headers.iter() {
        headers.set(name, value);
    }

    if !request.keep_alive {
        headers.set(CONNECTION.as_str(), "close");
    }

    log::debug!("{} {}", request.method, url);
    let response = transport.execute(TransportRequest {
        method: request.method.clone(),
        url: url.clone(),
        headers,
        body,
        proxy: request.proxy.clone(),
        trust: TrustPolicy::from_request(request.verify, &request.trusted_certs),
        connect_timeout: request.connect_timeout,
        read_timeout: request.read_timeout,
        keep_alive: request.keep_alive,
    })?;
    log::debug!("{} {} -> {}", request.method, url, response.status);

    let cookies: Vec<Cookie> = response
        .headers
        .get_all(SET_COOKIE.as_str())
        .into_iter()
        .filter_map(|value| {
            let cookie = Cookie::parse(host, cookie_path, value);
            if cookie.is_none() {
                log::debug!("ignoring set-cookie from {host}: {value}");
            }
            cookie
        })
        .collect();

    if !cookies.is_empty() {
        jar.write().unwrap_or_else(PoisonError::into_inner).merge(&cookies);
    }

    let raw = response
        .body
        .or(response.error_body)
        .unwrap_or_else(|| Box::new(io::empty()));
    let body = compression::wrap_body(
        response.status,
        &request.method,
        response.headers.first(CONTENT_ENCODING.as_str()),
        raw,
    )?;

    Ok(Envelope {
        url: url.clone(),
        status: response.status,
        status_line: response.status_line,
        headers: response.headers,
        cookies,
        body,
    })
}

/// Request cookies first, then the jar's matches, as `name=value; name=value`.
fn cookie_header(request: &Request, jar: &CookieJarHandle, protocol: &str, host: &str, path: &str) -> String {
    let matched = jar
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .matched(protocol, host, path);

    request
        .cookies
        .iter()
        .chain(matched.iter())
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}
