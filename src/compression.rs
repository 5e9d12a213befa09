//! Response body decompression.
//!
//! [`decoding_for`] is the pure decision, [`wrap_body`] applies it to a stream. Responses that
//! cannot carry a body (HEAD, 1xx, 204, 304) are never wrapped, even when a server still sends
//! `Content-Encoding`, because a gzip decoder fails on empty input.

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use http::Method;
use std::io::{self, Cursor, Read};

/// A body stream that owns the underlying connection.
pub type BodyReader = Box<dyn Read + Send>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Gzip,
    Deflate,
}

/// Decides which decoder (if any) a response body needs.
///
/// `identity`, `compress`, unknown tokens and a missing header all mean passthrough.
pub fn decoding_for(status: u16, method: &Method, content_encoding: Option<&str>) -> Option<ContentCoding> {
    if *method == Method::HEAD || (100..200).contains(&status) || status == 204 || status == 304 {
        return None;
    }

    let encoding = content_encoding?.trim();
    if encoding.eq_ignore_ascii_case("gzip") || encoding.eq_ignore_ascii_case("x-gzip") {
        Some(ContentCoding::Gzip)
    } else if encoding.eq_ignore_ascii_case("deflate") {
        Some(ContentCoding::Deflate)
    } else {
        None
    }
}

/// Wraps `input` in the decoder selected by [`decoding_for`].
///
/// A gzip body without a valid gzip header is rejected up front; `input` is dropped (and the
/// connection with it) before the error is returned.
pub fn wrap_body(
    status: u16,
    method: &Method,
    content_encoding: Option<&str>,
    mut input: BodyReader,
) -> io::Result<BodyReader> {
    match decoding_for(status, method, content_encoding) {
        None => Ok(input),
        Some(ContentCoding::Gzip) => {
            let (magic, filled) = read_prefix(&mut input)?;
            if filled < 2 || magic != GZIP_MAGIC {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "not in gzip format"));
            }
            Ok(Box::new(GzDecoder::new(Cursor::new(magic).chain(input))))
        }
        Some(ContentCoding::Deflate) => {
            let (magic, filled) = read_prefix(&mut input)?;
            let prefixed = Cursor::new(magic[..filled].to_vec()).chain(input);
            if filled == 0 {
                return Ok(Box::new(prefixed));
            }
            if filled == 2 && is_zlib_header(magic) {
                Ok(Box::new(ZlibDecoder::new(prefixed)))
            } else {
                Ok(Box::new(DeflateDecoder::new(prefixed)))
            }
        }
    }
}

/// Many servers send zlib-wrapped data for `deflate`; the two header bytes tell them apart.
fn is_zlib_header(magic: [u8; 2]) -> bool {
    magic[0] & 0x0f == 0x08 && (u16::from(magic[0]) << 8 | u16::from(magic[1])) % 31 == 0
}

fn read_prefix(input: &mut BodyReader) -> io::Result<([u8; 2], usize)> {
    let mut magic = [0u8; 2];
    let mut filled = 0;
    while filled < magic.len() {
        match input.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((magic, filled))
}
