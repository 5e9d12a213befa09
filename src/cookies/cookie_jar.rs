//! Cookie jar abstraction and a simple in-memory implementation.
//!
//! A **cookie jar** holds all cookies of one session. The dispatcher only needs two things
//! from it: the cookies that match a request, and a way to merge newly observed cookies.
//!
//! ## Notes & limitations
//! - The jar is **not** internally synchronized. Share it as a
//!   [`CookieJarHandle`] (`Arc<RwLock<dyn CookieJar + Send + Sync>>`): read lock for
//!   matching, write lock for merging.
//! - Merges are last-write-wins per (name, domain, path) slot.
//! - Expired cookies are dropped on merge and skipped on match; there is no eviction policy.

use crate::cookies::Cookie;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// A handle to a cookie jar.
///
/// Reference-counted, read/write-locked pointer to a type-erased [`CookieJar`].
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

/// Storage contract for the cookies of a session.
pub trait CookieJar: Send + Sync {
    /// Returns `(name, value)` pairs of all cookies that should be sent to
    /// `protocol://host` for a request whose effective path is `path`.
    ///
    /// Cookies with longer paths are listed first; ties keep insertion order.
    fn matched(&self, protocol: &str, host: &str, path: &str) -> Vec<(String, String)>;

    /// Merges cookies observed on a response into the jar.
    fn merge(&mut self, cookies: &[Cookie]);

    /// Returns a snapshot of all stored cookies.
    fn all(&self) -> Vec<Cookie>;

    /// Removes all cookies from the jar.
    fn clear(&mut self);
}

/// Default in-memory cookie jar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultCookieJar {
    entries: Vec<Cookie>,
}

impl DefaultCookieJar {
    /// Creates an empty in-memory cookie jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty jar already wrapped in a [`CookieJarHandle`].
    pub fn handle() -> CookieJarHandle {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CookieJar for DefaultCookieJar {
    fn matched(&self, protocol: &str, host: &str, path: &str) -> Vec<(String, String)> {
        let now = SystemTime::now();
        let mut found: Vec<&Cookie> = self
            .entries
            .iter()
            .filter(|c| c.matches(protocol, host, path, now))
            .collect();
        // stable sort keeps insertion order for equal path lengths
        found.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        found
            .into_iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    fn merge(&mut self, cookies: &[Cookie]) {
        let now = SystemTime::now();
        for cookie in cookies {
            let existing = self.entries.iter().position(|c| c.same_slot(cookie));

            if cookie.is_expired(now) {
                if let Some(idx) = existing {
                    self.entries.remove(idx);
                }
                continue;
            }

            match existing {
                Some(idx) => self.entries[idx] = cookie.clone(),
                None => self.entries.push(cookie.clone()),
            }
        }
        self.entries.retain(|c| !c.is_expired(now));
    }

    fn all(&self) -> Vec<Cookie> {
        self.entries.clone()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
