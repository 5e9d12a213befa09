//! JSON codec used by [`RawResponse::read_to_json`](crate::RawResponse::read_to_json).

use crate::errors::{RequestError, Result};
use encoding_rs::Encoding;
use serde::de::DeserializeOwned;
use std::io::Read;

/// Turns a response body into a typed value.
pub trait JsonCodec {
    /// Deserializes the content of `reader`, decoded with `charset`.
    ///
    /// An empty (or whitespace only) body and a JSON `null` yield `Ok(None)`.
    fn unmarshal<T: DeserializeOwned>(
        &self,
        reader: &mut dyn Read,
        charset: &'static Encoding,
    ) -> Result<Option<T>>;
}

/// The default codec, backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonCodec;

impl JsonCodec for SerdeJsonCodec {
    fn unmarshal<T: DeserializeOwned>(
        &self,
        reader: &mut dyn Read,
        charset: &'static Encoding,
    ) -> Result<Option<T>> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).map_err(RequestError::from_body_read)?;

        let (text, _) = charset.decode_with_bom_removal(&raw);
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str::<Option<T>>(&text)?)
    }
}
