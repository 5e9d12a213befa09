//! Charset resolution from `Content-Type` header values.
//!
//! The lookup is deliberately small: split on `;`, find the first `charset=` parameter
//! (key compared case-insensitively), strip optional quotes. Labels are resolved with the
//! WHATWG label table of `encoding_rs`, so `latin1`, `utf8`, `Shift_JIS` etc. all work.

use encoding_rs::{Encoding, UTF_8};

/// Returns the raw `charset` parameter of a `Content-Type` value, if present.
pub fn charset_label(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .find_map(|item| {
            let (key, value) = item.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches('"'))
            } else {
                None
            }
        })
}

/// Maps a charset label to an encoding. Unknown labels yield `None`.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Resolves the charset to read a body with: the `charset` parameter of the
/// `Content-Type` header, or UTF-8 when the header or parameter is absent.
///
/// A label that does not name a known encoding also falls back to UTF-8.
pub fn resolve_charset(content_type: Option<&str>) -> &'static Encoding {
    let Some(label) = content_type.and_then(charset_label) else {
        return UTF_8;
    };

    match encoding_for_label(label) {
        Some(encoding) => encoding,
        None => {
            log::warn!("unknown charset '{label}' in content-type, falling back to utf-8");
            UTF_8
        }
    }
}
