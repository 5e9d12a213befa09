//! Cookie record and `Set-Cookie` parsing.
//!
//! Parsing follows the practical subset of RFC 6265 used by the jar:
//! - `Domain` (leading dot stripped, must domain-match the request host, otherwise the
//!   cookie is rejected) turns the cookie into a domain cookie; without it the cookie is
//!   host-only.
//! - `Path` must start with `/`, otherwise the default path of the request is used.
//! - `Max-Age` sets the expiry instant; zero or negative values mark the cookie expired,
//!   which makes a merge delete the stored cookie.
//! - `Expires` is kept as the raw string and is not enforced.
//! - `Secure`, `HttpOnly` and `SameSite` are recorded.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// A cookie observed in a `Set-Cookie` response header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Domain the cookie belongs to, lower-cased. For host-only cookies this is the request host.
    pub domain: String,

    /// Path scoping; always starts with `/`.
    pub path: String,

    /// When `true` the cookie is only sent to exactly `domain`, not to its subdomains.
    pub host_only: bool,

    /// If `true`, cookie is sent only over HTTPS.
    pub secure: bool,

    /// If `true`, cookie is not exposed to scripts. Recorded only.
    pub http_only: bool,

    /// SameSite policy as sent by the server (`Strict`, `Lax`, `None`).
    pub same_site: Option<String>,

    /// Raw `Expires` attribute.
    pub expires: Option<String>,

    /// Expiry instant derived from `Max-Age`. Session cookies have `None`, and so do cookies whose
    /// `Max-Age` reaches past the representable range.
    pub expiry: Option<SystemTime>,
}

impl Cookie {
    /// Creates a host-only session cookie.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into().to_ascii_lowercase(),
            path: path.into(),
            host_only: true,
            secure: false,
            http_only: false,
            same_site: None,
            expires: None,
            expiry: None,
        }
    }

    /// Parses a `Set-Cookie` header value received from `host` for a request whose default
    /// cookie path is `default_path`.
    ///
    /// Returns `None` when the header has no `name=value` pair, the name is empty, or the
    /// `Domain` attribute does not cover `host`.
    pub fn parse(host: &str, default_path: &str, header: &str) -> Option<Cookie> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, value.trim().trim_matches('"'), host, default_path);

        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, val) = match part.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (part, ""),
            };

            match key.to_ascii_lowercase().as_str() {
                "domain" => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if domain.is_empty() {
                        continue;
                    }
                    if !domain_match(&domain, host) {
                        log::debug!("rejecting cookie '{name}': domain '{domain}' does not cover host '{host}'");
                        return None;
                    }
                    cookie.domain = domain;
                    cookie.host_only = false;
                }
                "path" => {
                    if val.starts_with('/') {
                        cookie.path = val.to_string();
                    }
                }
                "max-age" => {
                    if let Ok(seconds) = val.parse::<i64>() {
                        // an expiry past what SystemTime can hold never expires
                        cookie.expiry = if seconds <= 0 {
                            Some(SystemTime::UNIX_EPOCH)
                        } else {
                            SystemTime::now().checked_add(Duration::from_secs(seconds.unsigned_abs()))
                        };
                    }
                }
                "expires" => cookie.expires = Some(val.to_string()),
                "samesite" => {
                    let normalized = if val.eq_ignore_ascii_case("lax") {
                        "Lax"
                    } else if val.eq_ignore_ascii_case("strict") {
                        "Strict"
                    } else if val.eq_ignore_ascii_case("none") {
                        "None"
                    } else {
                        val
                    };
                    cookie.same_site = Some(normalized.to_string());
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }

        Some(cookie)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// True once the `Max-Age` derived expiry has passed.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expiry, Some(at) if at <= now)
    }

    /// True when two cookies address the same jar slot (name, domain, path).
    pub fn same_slot(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    /// Checks whether the cookie should be sent with a request to `protocol://host` + `path`.
    pub fn matches(&self, protocol: &str, host: &str, path: &str, now: SystemTime) -> bool {
        if self.is_expired(now) {
            return false;
        }
        if self.secure && !protocol.eq_ignore_ascii_case("https") {
            return false;
        }
        let host_ok = if self.host_only {
            self.domain.eq_ignore_ascii_case(host)
        } else {
            domain_match(&self.domain, host)
        };
        host_ok && path_match(&self.path, path)
    }
}

/// RFC 6265 domain matching: `host` equals `domain` or is a subdomain of it.
pub fn domain_match(domain: &str, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    if host == domain {
        return true;
    }
    host.len() > domain.len()
        && host.ends_with(&domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

/// RFC 6265 path matching: the cookie path is a prefix of the request path that ends on a
/// segment boundary.
pub fn path_match(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == request_path {
        return true;
    }
    if !request_path.starts_with(cookie_path) {
        return false;
    }
    cookie_path.ends_with('/') || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/')
}
