//! Constructor argument validation, producing an immutable [`RequestConfig`].

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Recognized HTTP methods. Closed set; see the `HEAD` open question in
/// the design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            _ => Err(ConfigError::MethodInvalid(raw.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of text encodings recognized for a text request body
/// and for a JSON response's `charset` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyEncoding {
    Utf8,
    Utf16Le,
    Ucs2,
    Latin1,
    Ascii,
    Base64,
    Base64Url,
    Hex,
}

impl BodyEncoding {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(BodyEncoding::Utf8),
            "utf16le" | "utf-16le" => Ok(BodyEncoding::Utf16Le),
            "ucs2" | "ucs-2" => Ok(BodyEncoding::Ucs2),
            "latin1" => Ok(BodyEncoding::Latin1),
            "ascii" => Ok(BodyEncoding::Ascii),
            "base64" => Ok(BodyEncoding::Base64),
            "base64url" => Ok(BodyEncoding::Base64Url),
            "hex" => Ok(BodyEncoding::Hex),
            _ => Err(ConfigError::BodyEncodingInvalid(raw.to_string())),
        }
    }
}

impl Default for BodyEncoding {
    fn default() -> Self {
        BodyEncoding::Utf8
    }
}

/// The request body, as a tagged variant chosen at construction. Keeps
/// dynamic-typing out of the encoder: by the time `encode()` runs, the
/// shape is already known.
#[derive(Debug, Clone)]
pub enum Body {
    Bytes(Vec<u8>),
    Text(String, BodyEncoding),
    Structured(serde_json::Value),
}

/// An ordered, case-insensitive-on-lookup header map that preserves
/// insertion order for reproducible wire output.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            existing.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Immutable, validated configuration for one request. Produced only
/// through [`RequestConfigBuilder::build`].
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub url: Url,
    pub method: Method,
    pub headers: Headers,
    pub timeout_ms: u64,
    pub body: Option<Body>,
    pub body_encoding: BodyEncoding,
    pub auto_json_response_parse: bool,
}

impl RequestConfig {
    pub fn origin(&self) -> String {
        let scheme = self.url.scheme();
        let host = self.url.host_str().unwrap_or("");
        match self.url.port_or_known_default() {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Builder mirroring the constructor surface described in the system
/// overview: a positional URL plus named options, each independently
/// validated.
#[derive(Debug, Default)]
pub struct RequestConfigBuilder {
    url: Option<UrlInput>,
    method: Option<Method>,
    headers: Headers,
    timeout_ms: Option<u64>,
    body: Option<Body>,
    body_encoding: Option<BodyEncoding>,
    auto_json_response_parse: Option<bool>,
}

/// The url argument accepts either a raw string or an already-parsed
/// [`Url`], matching the "string or pre-parsed URL" constructor surface.
#[derive(Debug, Clone)]
pub enum UrlInput {
    Str(String),
    Parsed(Url),
}

impl From<&str> for UrlInput {
    fn from(value: &str) -> Self {
        UrlInput::Str(value.to_string())
    }
}

impl From<String> for UrlInput {
    fn from(value: String) -> Self {
        UrlInput::Str(value)
    }
}

impl From<Url> for UrlInput {
    fn from(value: Url) -> Self {
        UrlInput::Parsed(value)
    }
}

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

impl RequestConfigBuilder {
    pub fn new(url: impl Into<UrlInput>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn body_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.body_encoding = Some(encoding);
        self
    }

    pub fn auto_json_response_parse(mut self, enabled: bool) -> Self {
        self.auto_json_response_parse = Some(enabled);
        self
    }

    /// Validate and freeze the configuration. Every failure here is
    /// synchronous: no instance exists until this returns `Ok`.
    pub fn build(self) -> Result<RequestConfig, ConfigError> {
        let url = match self.url.ok_or(ConfigError::UrlTypeInvalid)? {
            UrlInput::Str(s) => Url::parse(&s).map_err(ConfigError::UrlStringInvalid)?,
            UrlInput::Parsed(u) => u,
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::UrlProtocolInvalid(url.scheme().to_string()));
        }

        let method = self.method.unwrap_or(Method::Get);

        let timeout_ms = self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms < 1 {
            return Err(ConfigError::TimeoutOutOfBounds(timeout_ms));
        }

        let body_encoding = self.body_encoding.unwrap_or_default();
        let auto_json_response_parse = self.auto_json_response_parse.unwrap_or(true);

        Ok(RequestConfig {
            url,
            method,
            headers: self.headers,
            timeout_ms,
            body: self.body,
            body_encoding,
            auto_json_response_parse,
        })
    }
}
