//! Converts a configured [`Body`] into wire bytes plus a `Content-Length`.

use base64::Engine;

use crate::config::{Body, BodyEncoding};
use crate::error::RequestError;

/// `encode(body, body_encoding) -> (bytes, content_length)` from the
/// component design. Returns `None` when there is no body at all: no
/// write, no `Content-Length` header added by the encoder.
pub fn encode(
    body: Option<&Body>,
    body_encoding: BodyEncoding,
    origin: &str,
) -> Result<Option<Vec<u8>>, RequestError> {
    let Some(body) = body else {
        return Ok(None);
    };

    let bytes = match body {
        Body::Bytes(bytes) => bytes.clone(),
        Body::Text(text, _) => encode_text(text, body_encoding, origin)?,
        Body::Structured(value) => serde_json::to_vec(value).map_err(|source| {
            RequestError::HttpRequestBodyObjectNotSerializable {
                reason: source.to_string(),
            }
        })?,
    };

    Ok(Some(bytes))
}

fn encode_text(text: &str, encoding: BodyEncoding, origin: &str) -> Result<Vec<u8>, RequestError> {
    match encoding {
        BodyEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        BodyEncoding::Utf16Le => {
            let mut out = Vec::with_capacity(text.len() * 2);
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            Ok(out)
        }
        BodyEncoding::Ucs2 => {
            let mut out = Vec::with_capacity(text.len() * 2);
            for ch in text.chars() {
                let code = ch as u32;
                if code > 0xFFFF {
                    return Err(unrepresentable(origin, "ucs2"));
                }
                out.extend_from_slice(&(code as u16).to_le_bytes());
            }
            Ok(out)
        }
        BodyEncoding::Latin1 => {
            let mut out = Vec::with_capacity(text.len());
            for ch in text.chars() {
                let code = ch as u32;
                if code > 0xFF {
                    return Err(unrepresentable(origin, "latin1"));
                }
                out.push(code as u8);
            }
            Ok(out)
        }
        BodyEncoding::Ascii => {
            let mut out = Vec::with_capacity(text.len());
            for ch in text.chars() {
                let code = ch as u32;
                if code > 0x7F {
                    return Err(unrepresentable(origin, "ascii"));
                }
                out.push(code as u8);
            }
            Ok(out)
        }
        BodyEncoding::Base64 => base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|e| decode_failed(origin, "base64", e)),
        BodyEncoding::Base64Url => base64::engine::general_purpose::URL_SAFE
            .decode(text)
            .map_err(|e| decode_failed(origin, "base64url", e)),
        BodyEncoding::Hex => {
            hex::decode(text).map_err(|e| decode_failed(origin, "hex", e))
        }
    }
}

fn unrepresentable(origin: &str, encoding: &str) -> RequestError {
    RequestError::BodyEncodingFailed {
        origin: origin.to_string(),
        reason: format!("text contains a character outside the {encoding} range"),
    }
}

fn decode_failed(
    origin: &str,
    encoding: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> RequestError {
    RequestError::BodyEncodingFailed {
        origin: origin.to_string(),
        reason: format!("invalid {encoding} text body: {source}"),
    }
}
