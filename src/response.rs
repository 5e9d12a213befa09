//! Response lifecycle.
//!
//! [`RawResponse`] owns the body stream of the final hop, and with it the connection. The
//! stream is released exactly once: by the first terminal operation (`read_to_text`,
//! `read_to_bytes`, `read_to_json`, `write_to*`, `discard_body`, `to_response`,
//! `into_reader`), by an explicit [`RawResponse::close`], or when the value is dropped.
//!
//! Terminal operations consume the handle, so a second one cannot be written. After an explicit
//! `close()` every terminal operation fails with [`RequestError::BodyConsumed`], except
//! `discard_body` which has nothing left to do and succeeds.
//!
//! Metadata accessors never touch the stream and stay valid after closing.
//!
//! ```rust,no_run
//! use gosub_net::Session;
//!
//! let session = Session::new(None);
//! let text = session
//!     .send(session.get("https://example.com/")?)?
//!     .check_status()?
//!     .read_to_text()?;
//! # Ok::<(), gosub_net::RequestError>(())
//! ```

use crate::charset::resolve_charset;
use crate::compression::BodyReader;
use crate::cookies::Cookie;
use crate::errors::{RequestError, Result};
use crate::executor::Envelope;
use crate::headers::Headers;
use crate::json::{JsonCodec, SerdeJsonCodec};
use encoding_rs::{CoderResult, Encoding};
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use url::Url;

/// The final response of a request, with its body still unread.
pub struct RawResponse {
    url: Url,
    status: u16,
    status_line: String,
    headers: Headers,
    /// Cookies of the final hop first, then those of earlier redirect hops
    cookies: Vec<Cookie>,
    body: Option<BodyReader>,
    charset: Option<&'static Encoding>,
}

impl RawResponse {
    pub(crate) fn from_envelope(envelope: Envelope) -> Self {
        Self {
            url: envelope.url,
            status: envelope.status,
            status_line: envelope.status_line,
            headers: envelope.headers,
            cookies: envelope.cookies,
            body: Some(envelope.body),
            charset: None,
        }
    }

    /// Appends cookies set by earlier hops of a redirect chain, skipping the ones this response
    /// (or a later hop) already replaced.
    pub(crate) fn with_earlier_cookies(mut self, earlier: Vec<Cookie>) -> Self {
        for cookie in earlier.into_iter().rev() {
            if !self.cookies.iter().any(|c| c.same_slot(&cookie)) {
                self.cookies.push(cookie);
            }
        }
        self
    }

    /// Overrides the charset used by the text operations. Without it, the charset comes from the
    /// `Content-Type` header, defaulting to UTF-8.
    pub fn charset(mut self, charset: &'static Encoding) -> Self {
        self.charset = Some(charset);
        self
    }

    /// Fails with [`RequestError::BadStatus`] unless the status is 2xx. The response (and its
    /// connection) is released on failure.
    pub fn check_status(self) -> Result<Self> {
        if !(200..300).contains(&self.status) {
            return Err(RequestError::BadStatus(self.status));
        }
        Ok(self)
    }

    /// Reads the body as text. An empty body gives an empty string.
    pub fn read_to_text(mut self) -> Result<String> {
        let charset = self.resolved_charset();
        let mut body = self.take_body()?;

        let mut raw = Vec::new();
        body.read_to_end(&mut raw).map_err(RequestError::from_body_read)?;
        drop(body);

        let (text, _) = charset.decode_with_bom_removal(&raw);
        Ok(text.into_owned())
    }

    /// Reads the body as raw bytes.
    pub fn read_to_bytes(mut self) -> Result<Vec<u8>> {
        let mut body = self.take_body()?;
        let mut raw = Vec::new();
        body.read_to_end(&mut raw).map_err(RequestError::from_body_read)?;
        Ok(raw)
    }

    /// Hands status, headers and the body stream to `handler` and wraps its result.
    ///
    /// The stream is released afterwards, whether the handler succeeded or not.
    pub fn to_response<T, F>(mut self, handler: F) -> Result<Response<T>>
    where
        F: FnOnce(u16, &Headers, &mut dyn Read) -> io::Result<T>,
    {
        let mut body = self.take_body()?;
        let result = handler(self.status, &self.headers, &mut body);
        drop(body);

        let value = result.map_err(RequestError::from_body_read)?;
        Ok(self.into_typed(value))
    }

    /// Deserializes the body as JSON with the default codec.
    ///
    /// Returns `Ok(None)` for an empty body or a JSON `null`.
    pub fn read_to_json<T: DeserializeOwned>(self) -> Result<Option<T>> {
        self.read_to_json_with(&SerdeJsonCodec)
    }

    /// Deserializes the body with the given codec.
    pub fn read_to_json_with<T, C>(mut self, codec: &C) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        C: JsonCodec,
    {
        let charset = self.resolved_charset();
        let mut body = self.take_body()?;
        codec.unmarshal(&mut body, charset)
    }

    /// Writes the body to a new file at `path` (truncating an existing one).
    pub fn write_to_file(mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut body = self.take_body()?;
        let mut file = File::create(path.as_ref())?;
        io::copy(&mut body, &mut file).map_err(RequestError::from_body_read)?;
        file.flush()?;
        Ok(())
    }

    /// Copies the body into `out`. The sink is neither flushed nor closed.
    pub fn write_to<W: Write + ?Sized>(mut self, out: &mut W) -> Result<u64> {
        let mut body = self.take_body()?;
        io::copy(&mut body, out).map_err(RequestError::from_body_read)
    }

    /// Decodes the body with the response charset and streams the text into `sink`.
    /// The sink is not closed.
    pub fn write_to_text<W: fmt::Write + ?Sized>(mut self, sink: &mut W) -> Result<()> {
        let charset = self.resolved_charset();
        let mut body = self.take_body()?;
        let mut decoder = charset.new_decoder_with_bom_removal();

        let mut buf = [0u8; 8 * 1024];
        let mut chunk = String::new();
        loop {
            let n = match body.read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RequestError::from_body_read(e)),
            };
            let last = n == 0;

            let mut input = &buf[..n];
            loop {
                chunk.clear();
                chunk.reserve(decoder.max_utf8_buffer_length(input.len()).unwrap_or(input.len() * 4 + 16));
                let (result, read, _) = decoder.decode_to_string(input, &mut chunk, last);
                input = &input[read..];
                sink.write_str(&chunk)
                    .map_err(|_| RequestError::Io(io::Error::other("text sink refused write")))?;
                if result == CoderResult::InputEmpty {
                    break;
                }
            }

            if last {
                return Ok(());
            }
        }
    }

    /// Reads and drops the remaining body. A no-op on an exhausted or already closed body.
    pub fn discard_body(mut self) -> Result<()> {
        let Some(mut body) = self.body.take() else {
            return Ok(());
        };
        io::copy(&mut body, &mut io::sink()).map_err(RequestError::from_body_read)?;
        Ok(())
    }

    /// Takes the body stream. The caller becomes responsible for it; dropping it releases the
    /// connection.
    pub fn into_reader(mut self) -> Result<BodyReader> {
        self.take_body()
    }

    /// Converts into a response with the body as text.
    pub fn to_text_response(mut self) -> Result<Response<String>> {
        let charset = self.resolved_charset();
        let mut body = self.take_body()?;
        let mut raw = Vec::new();
        body.read_to_end(&mut raw).map_err(RequestError::from_body_read)?;
        drop(body);

        let (text, _) = charset.decode_with_bom_removal(&raw);
        let text = text.into_owned();
        Ok(self.into_typed(text))
    }

    /// Converts into a response with the body as bytes.
    pub fn to_bytes_response(self) -> Result<Response<Vec<u8>>> {
        self.to_response(|_, _, body| {
            let mut raw = Vec::new();
            body.read_to_end(&mut raw)?;
            Ok(raw)
        })
    }

    /// Converts into a response with the body deserialized from JSON.
    pub fn to_json_response<T: DeserializeOwned>(mut self) -> Result<Response<Option<T>>> {
        let charset = self.resolved_charset();
        let mut body = self.take_body()?;
        let value = SerdeJsonCodec.unmarshal(&mut body, charset)?;
        drop(body);
        Ok(self.into_typed(value))
    }

    /// Writes the body to `path` and returns a response carrying that path.
    pub fn to_file_response(mut self, path: impl Into<PathBuf>) -> Result<Response<PathBuf>> {
        let path = path.into();
        let mut body = self.take_body()?;
        let mut file = File::create(&path)?;
        io::copy(&mut body, &mut file).map_err(RequestError::from_body_read)?;
        file.flush()?;
        drop(body);
        Ok(self.into_typed(path))
    }

    /// Releases the body stream. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(body) = self.body.take() {
            drop(body);
            log::trace!("released response body of {}", self.url);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none()
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// URL of the hop that produced this response (the last redirect target, if any).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// All values of header `name`, empty when absent.
    pub fn headers_named(&self, name: &str) -> Vec<&str> {
        self.headers.get_all(name)
    }

    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.headers.first(name)
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// The most recently set cookie called `name`.
    pub fn first_cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    fn resolved_charset(&self) -> &'static Encoding {
        self.charset
            .unwrap_or_else(|| resolve_charset(self.headers.first(CONTENT_TYPE.as_str())))
    }

    fn take_body(&mut self) -> Result<BodyReader> {
        self.body.take().ok_or(RequestError::BodyConsumed)
    }

    fn into_typed<T>(&mut self, body: T) -> Response<T> {
        Response {
            url: self.url.clone(),
            status: self.status,
            headers: std::mem::take(&mut self.headers),
            cookies: std::mem::take(&mut self.cookies),
            body,
        }
    }
}

impl Drop for RawResponse {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("url", &self.url.as_str())
            .field("status_line", &self.status_line)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A fully consumed response with a typed body.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub url: Url,
    pub status: u16,
    pub headers: Headers,
    pub cookies: Vec<Cookie>,
    pub body: T,
}

impl<T> Response<T> {
    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.headers.first(name)
    }

    pub fn first_cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn into_body(self) -> T {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::TrackedBody;
    use encoding_rs::{SHIFT_JIS, WINDOWS_1252};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn response(status: u16, headers: &[(&str, &str)], body: &[u8]) -> (RawResponse, Arc<AtomicBool>) {
        let (body, released) = TrackedBody::new(body.to_vec());
        let mut list = Headers::new();
        for (k, v) in headers {
            list.append(*k, *v);
        }
        let raw = RawResponse::from_envelope(Envelope {
            url: Url::parse("http://example.com/").unwrap(),
            status,
            status_line: format!("HTTP/1.1 {status}"),
            headers: list,
            cookies: vec![Cookie::new("s", "1", "example.com", "/")],
            body: Box::new(body),
        });
        (raw, released)
    }

    #[test]
    fn read_to_text_uses_header_charset_and_releases() {
        let (raw, released) = response(200, &[("Content-Type", "text/plain; charset=ISO-8859-1")], b"caf\xe9");
        assert_eq!(raw.read_to_text().unwrap(), "café");
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn explicit_charset_wins_over_header() {
        let (raw, _) = response(200, &[("Content-Type", "text/plain; charset=utf-8")], b"\x82\xa0");
        assert_eq!(raw.charset(SHIFT_JIS).read_to_text().unwrap(), "あ");
    }

    #[test]
    fn default_charset_is_utf8() {
        let (raw, _) = response(200, &[], "héllo".as_bytes());
        assert_eq!(raw.read_to_text().unwrap(), "héllo");
    }

    #[test]
    fn read_to_bytes_and_empty_body() {
        let (raw, released) = response(200, &[], b"\x00\x01");
        assert_eq!(raw.read_to_bytes().unwrap(), vec![0, 1]);
        assert!(released.load(Ordering::SeqCst));

        let (raw, _) = response(200, &[], b"");
        assert_eq!(raw.read_to_text().unwrap(), "");
    }

    #[test]
    fn check_status_guards_2xx() {
        let (raw, released) = response(404, &[], b"missing");
        let err = raw.check_status().unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(matches!(err, RequestError::BadStatus(404)));
        assert!(released.load(Ordering::SeqCst));

        let (raw, released) = response(204, &[], b"");
        let raw = raw.check_status().unwrap();
        assert_eq!(raw.status_code(), 204);
        assert!(!released.load(Ordering::SeqCst));
    }

    #[test]
    fn handler_result_and_failure() {
        let (raw, released) = response(201, &[("X-Id", "7")], b"body");
        let typed = raw
            .to_response(|status, headers, body| {
                let mut text = String::new();
                body.read_to_string(&mut text)?;
                Ok(format!("{status}:{}:{text}", headers.first("x-id").unwrap_or("")))
            })
            .unwrap();
        assert_eq!(typed.body, "201:7:body");
        assert_eq!(typed.first_cookie("s").map(|c| c.value.as_str()), Some("1"));
        assert!(released.load(Ordering::SeqCst));

        let (raw, released) = response(200, &[], b"body");
        let err = raw
            .to_response::<(), _>(|_, _, _| Err(io::Error::other("handler failed")))
            .unwrap_err();
        assert!(matches!(err, RequestError::Io(_)));
        assert!(released.load(Ordering::SeqCst));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Greeting {
        hello: String,
    }

    #[test]
    fn json_operations() {
        let (raw, released) = response(200, &[("Content-Type", "application/json")], br#"{"hello":"world"}"#);
        let value: Option<Greeting> = raw.read_to_json().unwrap();
        assert_eq!(value, Some(Greeting { hello: "world".into() }));
        assert!(released.load(Ordering::SeqCst));

        let (raw, _) = response(200, &[], b"");
        assert_eq!(raw.read_to_json::<Greeting>().unwrap(), None);

        let (raw, released) = response(200, &[], b"{oops");
        assert!(matches!(raw.read_to_json::<Greeting>(), Err(RequestError::Json(_))));
        assert!(released.load(Ordering::SeqCst));

        let (raw, _) = response(200, &[], br#"{"hello":"typed"}"#);
        let typed = raw.to_json_response::<Greeting>().unwrap();
        assert_eq!(typed.status, 200);
        assert_eq!(typed.body.unwrap().hello, "typed");
    }

    #[test]
    fn writes_to_file_and_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.bin");

        let (raw, released) = response(200, &[], b"file content");
        raw.write_to_file(&path).unwrap();
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(std::fs::read(&path).unwrap(), b"file content");

        let (raw, _) = response(200, &[], b"again");
        let typed = raw.to_file_response(dir.path().join("other.bin")).unwrap();
        assert_eq!(std::fs::read(&typed.body).unwrap(), b"again");

        let mut sink = Vec::new();
        let (raw, released) = response(200, &[], b"to sink");
        assert_eq!(raw.write_to(&mut sink).unwrap(), 7);
        assert_eq!(sink, b"to sink");
        assert!(released.load(Ordering::SeqCst));
        // the sink is still usable
        sink.extend_from_slice(b"!");

        let mut text = String::from(">");
        let (raw, _) = response(200, &[("Content-Type", "text/plain; charset=windows-1252")], b"caf\xe9");
        raw.write_to_text(&mut text).unwrap();
        assert_eq!(text, ">café");
    }

    #[test]
    fn text_sink_receives_bodies_larger_than_one_read() {
        let page = "é".repeat(20_000);
        let mut text = String::new();
        let (raw, released) = response(200, &[], page.as_bytes());
        raw.write_to_text(&mut text).unwrap();
        assert_eq!(text, page);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn explicit_charset_applies_to_text_sink() {
        let mut text = String::new();
        let (raw, _) = response(200, &[], b"\xe9t\xe9");
        raw.charset(WINDOWS_1252).write_to_text(&mut text).unwrap();
        assert_eq!(text, "été");
    }

    #[test]
    fn discard_and_close_are_idempotent() {
        let (raw, released) = response(200, &[], b"ignored");
        raw.discard_body().unwrap();
        assert!(released.load(Ordering::SeqCst));

        // already exhausted body
        let (raw, _) = response(200, &[], b"");
        raw.discard_body().unwrap();

        let (mut raw, released) = response(200, &[("X-A", "1")], b"ignored");
        raw.close();
        raw.close();
        assert!(released.load(Ordering::SeqCst));
        assert!(raw.is_closed());
        // metadata survives closing
        assert_eq!(raw.first_header("x-a"), Some("1"));
        assert_eq!(raw.status_line(), "HTTP/1.1 200");
        raw.discard_body().unwrap();
    }

    #[test]
    fn terminal_operation_after_close_fails() {
        let (mut raw, _) = response(200, &[], b"data");
        raw.close();
        assert!(matches!(raw.read_to_text(), Err(RequestError::BodyConsumed)));
    }

    #[test]
    fn dropping_releases_the_connection() {
        let (raw, released) = response(200, &[], b"never read");
        drop(raw);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn into_reader_transfers_ownership() {
        let (raw, released) = response(200, &[], b"stream");
        let mut reader = raw.into_reader().unwrap();
        assert!(!released.load(Ordering::SeqCst));
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "stream");
        drop(reader);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors() {
        let (raw, _) = response(200, &[("Vary", "a"), ("vary", "b")], b"");
        assert_eq!(raw.headers_named("VARY"), vec!["a", "b"]);
        assert_eq!(raw.first_cookie("s").unwrap().value(), "1");
        assert!(raw.first_cookie("missing").is_none());
        assert_eq!(raw.cookies().len(), 1);
        assert_eq!(raw.url().as_str(), "http://example.com/");
    }

    #[test]
    fn earlier_cookies_do_not_shadow_newer_ones() {
        let (raw, _) = response(200, &[], b"");
        let raw = raw.with_earlier_cookies(vec![
            Cookie::new("s", "old", "example.com", "/"),
            Cookie::new("t", "2", "example.com", "/"),
        ]);
        assert_eq!(raw.first_cookie("s").unwrap().value(), "1");
        assert_eq!(raw.first_cookie("t").unwrap().value(), "2");
        assert_eq!(raw.cookies().len(), 2);
    }
}
