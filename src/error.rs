//! Public error taxonomy for the request lifecycle.
//!
//! Validation errors are raised synchronously at construction time.
//! State-violation errors are raised synchronously from `perform`/`cancel`.
//! Everything else settles the perform-future instead of being returned
//! directly, since it can only be known once the transport has been driven.
//!
//! [`RequestError`] is `Clone` so that a second, idempotent `perform()`
//! call can be handed the exact same settled outcome as the first.

use thiserror::Error;

/// Errors raised while validating constructor arguments, before any
/// instance exists.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("url must be a string or a pre-parsed Url")]
    UrlTypeInvalid,
    #[error("url string could not be parsed: {0}")]
    UrlStringInvalid(#[source] url::ParseError),
    #[error("url scheme must be http or https, got {0:?}")]
    UrlProtocolInvalid(String),
    #[error("method must be a recognized HTTP method name")]
    MethodTypeInvalid,
    #[error("method {0:?} is not one of GET, POST, PUT, DELETE, PATCH, HEAD")]
    MethodInvalid(String),
    #[error("headers must be a string-to-string mapping")]
    HeadersTypeInvalid,
    #[error("timeout must be a positive integer number of milliseconds")]
    TimeoutTypeInvalid,
    #[error("timeout {0} ms is out of bounds, must be >= 1")]
    TimeoutOutOfBounds(u64),
    #[error("body must be a byte buffer, text, or a JSON-serializable value")]
    BodyTypeInvalid,
    #[error("body_encoding must be a recognized encoding name")]
    BodyEncodingTypeInvalid,
    #[error("body_encoding {0:?} is not a recognized encoding")]
    BodyEncodingInvalid(String),
    #[error("auto_json_response_parse must be a boolean")]
    AutoJsonResponseParseOptionTypeInvalid,
}

/// Errors raised synchronously from `perform()`/`cancel()` when the
/// instance's current state does not permit the call.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("perform() is unavailable in the current state")]
    MakeRequestUnavailable,
    #[error("cancel() is unavailable in the current state")]
    CancelRequestUnavailable,
}

/// The taxonomy of causes that can settle the perform-future.
///
/// `origin` throughout is the `<scheme>://<host>:<port>` triple of the
/// request URL, used purely for diagnostics. Underlying causes (I/O
/// errors, JSON parse errors) are flattened to their `Display` text
/// rather than chained with `#[source]`, so the whole enum stays
/// `Clone` and can be replayed to every idempotent `perform()` caller.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("request timed out after {timeout_ms} ms writing to {origin}")]
    HttpRequestTimedOut { origin: String, timeout_ms: u64 },

    #[error("response timed out after {timeout_ms} ms waiting on {origin}")]
    HttpResponseTimedOut { origin: String, timeout_ms: u64 },

    #[error("request to {origin} was cancelled")]
    HttpRequestCancelled { origin: String },

    #[error("response body from {origin} could not be parsed as JSON: {reason}")]
    HttpResponseBodyNotParseableAsJson { origin: String, reason: String },

    #[error("request body could not be serialized as JSON: {reason}")]
    HttpRequestBodyObjectNotSerializable { reason: String },

    #[error("request body is not representable under its configured encoding: {reason}")]
    BodyEncodingFailed { origin: String, reason: String },

    #[error("connection to {origin} was reset by the peer")]
    NetworkConnectionReset { origin: String },

    #[error("broken pipe writing to {origin}")]
    BrokenPipe { origin: String },

    #[error("connection to {origin} was refused")]
    ConnectionRefused { origin: String },

    #[error("host for {origin} is unreachable")]
    HostUnreachable { origin: String },

    #[error("network is down, could not reach {origin}")]
    NetworkDown { origin: String },

    #[error("hostname in {origin} could not be resolved")]
    HostnameNotFound { origin: String },

    #[error("network operation against {origin} timed out at the socket level")]
    NetworkTimedOut { origin: String },

    #[error("connection to {origin} aborted")]
    ConnectionAborted { origin: String },

    #[error("TLS handshake with {origin} failed: {reason}")]
    TlsHandshakeFailed { origin: String, reason: String },

    #[error("malformed HTTP response head from {origin}")]
    MalformedResponseHead { origin: String },

    #[error("unrecognized failure talking to {origin}: {reason}")]
    Unknown { origin: String, reason: String },
}

impl RequestError {
    /// True for the one cause that must drive the state machine to
    /// `CANCELLED` instead of `FAILED`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RequestError::HttpRequestCancelled { .. })
    }

    pub fn unknown(origin: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RequestError::Unknown {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Top-level error type returned by the constructor.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}
