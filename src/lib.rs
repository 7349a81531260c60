//! A one-shot, promise-style HTTP/HTTPS client: construct an
//! [`HttpRequest`] from a [`RequestConfig`], call [`HttpRequest::perform`]
//! to drive it to completion, optionally [`HttpRequest::cancel`] it in
//! flight, and observe [`HttpRequest::state`] at any time.

mod body;
mod client;
mod config;
mod content_type;
mod driver;
mod error;
mod response;
mod state;
mod timeout;
mod transport;

pub use client::HttpRequest;
pub use config::{Body, BodyEncoding, Headers, Method, RequestConfig, RequestConfigBuilder, UrlInput, DEFAULT_TIMEOUT_MS};
pub use error::{BuildError, ConfigError, RequestError, StateError};
pub use response::{HttpResponse, ResponseBody, ResponseError};
pub use state::ClientState;
