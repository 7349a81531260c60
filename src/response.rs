//! The finished response value and the Response Assembler.

use thiserror::Error;

use crate::config::{BodyEncoding, Headers};
use crate::content_type;
use crate::error::RequestError;

/// Construction-time invariants for [`HttpResponse`], a sibling
/// taxonomy to [`crate::error::RequestError`] since a response is a
/// value type with its own validity rules.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response headers must be a string-to-string mapping")]
    HeadersTypeInvalid,
    #[error("status code must be an integer")]
    StatusCodeTypeInvalid,
    #[error("status code {0} is out of bounds, must be in 100..=599")]
    StatusCodeOutOfBounds(u16),
    #[error("status message must be a string")]
    StatusMessageTypeInvalid,
    #[error("body must be a byte buffer or a JSON value")]
    BodyTypeInvalid,
}

/// The body of a finished response: either the raw bytes as received,
/// or the JSON value it auto-decoded to.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

/// A validated, immutable response value.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub status_message: String,
    pub headers: Headers,
    pub body: Option<ResponseBody>,
}

impl HttpResponse {
    pub fn new(
        status_code: u16,
        status_message: String,
        headers: Headers,
        body: Option<ResponseBody>,
    ) -> Result<Self, ResponseError> {
        if !(100..=599).contains(&status_code) {
            return Err(ResponseError::StatusCodeOutOfBounds(status_code));
        }
        Ok(Self {
            status_code,
            status_message,
            headers,
            body,
        })
    }
}

/// Build the finished [`HttpResponse`] from accumulated wire data,
/// running JSON auto-decoding when the caller opted in and the
/// `Content-Type` matches.
pub fn assemble(
    status_code: u16,
    status_message: String,
    headers: Headers,
    raw_body: Vec<u8>,
    auto_json_response_parse: bool,
    origin: &str,
) -> Result<HttpResponse, RequestError> {
    if raw_body.is_empty() {
        let response = HttpResponse::new(status_code, status_message, headers, None)
            .map_err(|e| malformed(origin, e))?;
        return Ok(response);
    }

    let json_charset = auto_json_response_parse
        .then(|| headers.get("content-type"))
        .flatten()
        .and_then(content_type::parse)
        .filter(|mt| mt.is_json())
        .map(|mt| mt.charset.unwrap_or_else(|| "utf8".to_string()))
        .and_then(|raw| BodyEncoding::parse(&raw).ok());

    let body = if let Some(encoding) = json_charset {
        let text = decode_text(&raw_body, encoding).ok_or_else(|| {
            RequestError::unknown(origin, "response body is not valid under its declared charset")
        })?;
        let value: serde_json::Value = serde_json::from_str(&text).map_err(|source| {
            RequestError::HttpResponseBodyNotParseableAsJson {
                origin: origin.to_string(),
                reason: source.to_string(),
            }
        })?;
        ResponseBody::Json(value)
    } else {
        ResponseBody::Bytes(raw_body)
    };

    HttpResponse::new(status_code, status_message, headers, Some(body))
        .map_err(|e| malformed(origin, e))
}

fn malformed(origin: &str, source: ResponseError) -> RequestError {
    RequestError::unknown(origin, source)
}

/// Decode bytes to text under one of the closed-set encodings, for the
/// subset that can appear as a JSON response `charset`. Returns `None`
/// if the bytes are not valid under that encoding.
fn decode_text(bytes: &[u8], encoding: BodyEncoding) -> Option<String> {
    match encoding {
        BodyEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(|s| s.to_string()),
        BodyEncoding::Utf16Le => {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        BodyEncoding::Ucs2 => {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let mut s = String::with_capacity(bytes.len() / 2);
            for chunk in bytes.chunks_exact(2) {
                let code = u16::from_le_bytes([chunk[0], chunk[1]]);
                s.push(char::from_u32(code as u32)?);
            }
            Some(s)
        }
        BodyEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        BodyEncoding::Ascii => {
            if bytes.iter().any(|&b| b > 0x7F) {
                return None;
            }
            Some(bytes.iter().map(|&b| b as char).collect())
        }
        BodyEncoding::Base64 | BodyEncoding::Base64Url | BodyEncoding::Hex => {
            // These encode *into* bytes from text; they never describe
            // what a received byte stream's text looks like, so they
            // are not valid JSON response charsets.
            None
        }
    }
}
