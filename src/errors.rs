use std::io;

/// Errors produced while executing a request or consuming its response.
///
/// The variants fall into four groups:
/// - **transport**: [`RequestError::Io`], the connection could not be opened, written or read.
/// - **protocol**: missing or malformed redirect locations, redirect loops.
/// - **status**: [`RequestError::BadStatus`], only raised by an explicit `check_status()`.
/// - **decode**: malformed compressed streams and JSON that does not parse.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("redirect location not found")]
    RedirectLocationNotFound,

    #[error("get redirect url error: {0}")]
    RedirectUrl(url::ParseError),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("bad status: {0}")]
    BadStatus(u16),

    #[error("decode error: {0}")]
    Decode(io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response body already consumed")]
    BodyConsumed,
}

impl RequestError {
    /// Classifies an error raised while reading a response body.
    ///
    /// Decompressors and charset decoders report corrupt input as `InvalidData`,
    /// everything else is a transport failure.
    pub(crate) fn from_body_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::InvalidData {
            RequestError::Decode(err)
        } else {
            RequestError::Io(err)
        }
    }

    /// Returns the status code carried by a [`RequestError::BadStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::BadStatus(code) => Some(*code),
            _ => None,
        }
    }

    /// True for the redirect related protocol failures.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            RequestError::RedirectLocationNotFound
                | RequestError::RedirectUrl(_)
                | RequestError::TooManyRedirects
        )
    }
}

pub type Result<T> = std::result::Result<T, RequestError>;
