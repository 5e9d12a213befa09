//! Scripted in-memory transport for unit tests.

use crate::compression::BodyReader;
use crate::errors::{RequestError, Result};
use crate::headers::Headers;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Body stream that records when it is dropped, standing in for a live connection.
pub(crate) struct TrackedBody {
    inner: Cursor<Vec<u8>>,
    /// Every read fails with this kind
    fail_with: Option<io::ErrorKind>,
    released: Arc<AtomicBool>,
    open: Arc<AtomicUsize>,
}

impl TrackedBody {
    /// A standalone tracked body and its release flag.
    pub fn new(data: impl Into<Vec<u8>>) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let body = Self {
            inner: Cursor::new(data.into()),
            fail_with: None,
            released: released.clone(),
            open: Arc::new(AtomicUsize::new(1)),
        };
        (body, released)
    }
}

impl Read for TrackedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(kind) = self.fail_with {
            return Err(io::Error::new(kind, "scripted read failure"));
        }
        self.inner.read(buf)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A canned response.
pub(crate) struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
    /// Serve the body through the error stream instead of the regular one
    pub via_error_stream: bool,
    /// Offer no body stream at all
    pub no_stream: bool,
    /// Reads from the body fail with this kind
    pub read_error: Option<io::ErrorKind>,
    pub released: Arc<AtomicBool>,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            via_error_stream: false,
            no_stream: false,
            read_error: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn via_error_stream(mut self) -> Self {
        self.via_error_stream = true;
        self
    }

    pub fn failing_read(mut self, kind: io::ErrorKind) -> Self {
        self.read_error = Some(kind);
        self
    }

    pub fn without_stream(mut self) -> Self {
        self.no_stream = true;
        self
    }

    /// Flag flipped once the body of this reply has been released.
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }
}

/// Replays [`Reply`]s in order and records every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Reply>>>,
    seen: Mutex<Vec<TransportRequest>>,
    open: Arc<AtomicUsize>,
    max_open: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            ..Self::default()
        })
    }

    /// Queues a failure for the next exchange.
    pub fn fail_next(&self, err: RequestError) {
        self.replies.lock().unwrap().push_front(Err(err));
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Highest number of bodies that were alive at the same time when an exchange started.
    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.seen.lock().unwrap().push(request);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RequestError::Io(io::Error::other("script exhausted"))))?;

        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now_open, Ordering::SeqCst);

        let body: BodyReader = Box::new(TrackedBody {
            inner: Cursor::new(reply.body),
            fail_with: reply.read_error,
            released: reply.released,
            open: self.open.clone(),
        });

        let (body, error_body) = if reply.no_stream {
            drop(body);
            (None, None)
        } else if reply.via_error_stream {
            (None, Some(body))
        } else {
            (Some(body), None)
        };

        let mut headers = Headers::new();
        for (name, value) in reply.headers {
            headers.append(name, value);
        }

        Ok(TransportResponse {
            status: reply.status,
            status_line: format!("HTTP/1.1 {}", reply.status),
            headers,
            body,
            error_body,
        })
    }
}
