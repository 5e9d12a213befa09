//! [`Transport`] on top of the blocking `reqwest` client.
//!
//! A client is built per exchange from the request's proxy, trust policy and timeouts. Its own
//! redirect handling and content decoding are switched off; without an explicit proxy the
//! environment proxy settings are ignored as well.

use crate::errors::{RequestError, Result};
use crate::headers::Headers;
use crate::transport::{Transport, TransportRequest, TransportResponse, TrustPolicy};
use http::header::PROXY_AUTHORIZATION;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::io;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }

    fn client_for(request: &TransportRequest) -> Result<Client> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .connect_timeout(non_zero(request.connect_timeout))
            .timeout(non_zero(request.read_timeout));

        builder = match &request.proxy {
            Some(proxy) => {
                let mut upstream = reqwest::Proxy::all(proxy.url()).map_err(map_reqwest_error)?;
                if let Some(auth) = &proxy.auth {
                    upstream = upstream.basic_auth(&auth.user, &auth.password);
                }
                builder.proxy(upstream)
            }
            None => builder.no_proxy(),
        };

        match &request.trust {
            TrustPolicy::Platform => {}
            TrustPolicy::TrustAll => builder = builder.danger_accept_invalid_certs(true),
            TrustPolicy::Custom(certs) => {
                builder = builder.tls_built_in_root_certs(false);
                for pem in certs {
                    let cert = reqwest::Certificate::from_pem(pem).map_err(map_reqwest_error)?;
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        if !request.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }

        builder.build().map_err(map_reqwest_error)
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let client = Self::client_for(&request)?;
        let headers = origin_headers(&request);

        let TransportRequest {
            method,
            url,
            body,
            ..
        } = request;

        log::trace!("opening {} {}", method, url);
        let mut outgoing = client.request(method, url);
        for (name, value) in headers.iter() {
            outgoing = outgoing.header(name, value);
        }
        if let Some(body) = body {
            outgoing = outgoing.body(body);
        }

        let response = outgoing.send().map_err(map_reqwest_error)?;

        let status = response.status();
        let status_line = format!("{:?} {}", response.version(), status);
        let mut response_headers = Headers::new();
        for (name, value) in response.headers() {
            response_headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        log::trace!("received {status_line} with {} headers", response_headers.len());

        Ok(TransportResponse {
            status: status.as_u16(),
            status_line,
            headers: response_headers,
            body: Some(Box::new(response)),
            error_body: None,
        })
    }
}

/// Headers to put on the request itself.
///
/// With an authenticating proxy the credentials travel through `reqwest::Proxy::basic_auth`,
/// which puts them on the proxy hop only. Sending `Proxy-Authorization` as a plain header as
/// well would carry it through a CONNECT tunnel to the origin server.
fn origin_headers(request: &TransportRequest) -> Headers {
    let proxy_auth = request.proxy.as_ref().is_some_and(|p| p.auth.is_some());
    let mut headers = Headers::new();
    for (name, value) in request.headers.iter() {
        if proxy_auth && name.eq_ignore_ascii_case(PROXY_AUTHORIZATION.as_str()) {
            continue;
        }
        headers.append(name, value);
    }
    headers
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    if timeout.is_zero() {
        None
    } else {
        Some(timeout)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> RequestError {
    if err.is_builder() {
        return RequestError::InvalidRequest(err.to_string());
    }
    let kind = if err.is_timeout() {
        io::ErrorKind::TimedOut
    } else if err.is_connect() {
        io::ErrorKind::ConnectionRefused
    } else {
        io::ErrorKind::Other
    };
    RequestError::Io(io::Error::new(kind, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{BasicAuth, Proxy};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use url::Url;

    /// Serves `response` to the first connection and returns the raw request head it received.
    fn serve_once(response: &'static [u8]) -> (Url, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response).unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        (Url::parse(&format!("http://{addr}/a/b")).unwrap(), handle)
    }

    fn request(url: Url) -> TransportRequest {
        let mut headers = Headers::new();
        headers.set("User-Agent", "transport-test");
        headers.set("Cookie", "a=1; b=2");
        TransportRequest {
            method: http::Method::GET,
            url,
            headers,
            body: None,
            proxy: None,
            trust: TrustPolicy::Platform,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            keep_alive: false,
        }
    }

    #[test]
    fn does_not_follow_redirects() {
        let (url, server) = serve_once(
            b"HTTP/1.1 302 Found\r\nLocation: /c\r\nSet-Cookie: s=1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );

        let response = ReqwestTransport::new().execute(request(url)).unwrap();
        assert_eq!(response.status, 302);
        assert_eq!(response.status_line, "HTTP/1.1 302 Found");
        assert_eq!(response.headers.first("Location"), Some("/c"));
        assert_eq!(response.headers.first("set-cookie"), Some("s=1"));

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /a/b http/1.1"));
        assert!(head.contains("user-agent: transport-test"));
        assert!(head.contains("cookie: a=1; b=2"));
    }

    #[test]
    fn leaves_content_encoding_alone() {
        let (url, server) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: 4\r\nConnection: close\r\n\r\nnope",
        );

        let response = ReqwestTransport::new().execute(request(url)).unwrap();
        let mut body = Vec::new();
        response.body.unwrap().read_to_end(&mut body).unwrap();
        assert_eq!(body, b"nope");
        server.join().unwrap();
    }

    #[test]
    fn proxy_credentials_stay_off_the_origin_request() {
        let auth = BasicAuth::new("proxy-user", "secret");
        let mut request = request(Url::parse("https://origin.example/").unwrap());
        request.headers.set("Proxy-Authorization", auth.encode());
        request.proxy = Some(Proxy::http("127.0.0.1", 3128).with_auth(auth));

        let headers = origin_headers(&request);
        assert!(!headers.contains("proxy-authorization"));
        assert_eq!(headers.first("cookie"), Some("a=1; b=2"));

        // without proxy credentials the header is the caller's business
        request.proxy = Some(Proxy::http("127.0.0.1", 3128));
        assert!(origin_headers(&request).contains("proxy-authorization"));
    }

    #[test]
    fn proxy_receives_a_single_authorization() {
        // the loopback server plays the proxy for a plain http origin
        let (proxy_url, server) = serve_once(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let auth = BasicAuth::new("proxy-user", "secret");

        let mut request = request(Url::parse("http://origin.example/page").unwrap());
        request.headers.set("Proxy-Authorization", auth.encode());
        request.proxy = Some(
            Proxy::http(proxy_url.host_str().unwrap(), proxy_url.port().unwrap()).with_auth(auth.clone()),
        );

        let response = ReqwestTransport::new().execute(request).unwrap();
        assert_eq!(response.status, 204);

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get http://origin.example/page http/1.1"), "{head}");
        let expected = format!("proxy-authorization: {}", auth.encode().to_ascii_lowercase());
        assert_eq!(head.matches("proxy-authorization:").count(), 1, "{head}");
        assert!(head.contains(&expected), "{head}");
    }

    #[test]
    fn refused_connection_is_an_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let err = ReqwestTransport::new().execute(request(url)).unwrap_err();
        assert!(matches!(err, RequestError::Io(_)), "unexpected error: {err:?}");
    }
}
