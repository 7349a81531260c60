//! The concrete TCP/TLS transport the Transport Driver programs
//! against, plus the narrow interface (`open`/write a chunk/read a
//! chunk/destroy) that makes the driver testable without caring
//! whether the socket underneath is plaintext or `rustls`-wrapped.

mod errors;
mod stream;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::config::{Headers, Method, RequestConfig};
use crate::error::RequestError;

use self::stream::Stream;

pub(crate) use errors::{map_io_error, map_resolution_error, map_tls_error};

/// The high-water mark for a single outbound write. Backpressure is
/// modeled as the suspension point of awaiting this write complete,
/// not as an explicit "ready" flag (see the design notes on
/// re-architecting drain-event waits).
pub const WRITE_CHUNK_SIZE: usize = 64 * 1024;
/// The buffer size for a single inbound read.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;
/// Bound on how long DNS resolution + TCP connect + TLS handshake may
/// take before it's folded into the request-phase timeout's clock.
const CONNECT_GRACE: Duration = Duration::from_secs(30);

/// Status line and headers of a received response.
pub struct ResponseHead {
    pub status_code: u16,
    pub status_message: String,
    pub headers: Headers,
}

/// The narrow surface the Transport Driver programs against: write the
/// head, stream body chunks, half-close, then read the response head
/// and body. Kept as a trait (rather than calling `TcpTransport`
/// directly) so the driver doesn't care whether the socket underneath
/// is plaintext or TLS, and so it can be substituted in a test double.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn write_head(&mut self, head: &[u8], origin: &str) -> Result<(), RequestError>;
    async fn write_body_chunk(&mut self, chunk: &[u8], origin: &str) -> Result<(), RequestError>;
    async fn finish_write(&mut self, origin: &str) -> Result<(), RequestError>;
    async fn read_head(&mut self, origin: &str) -> Result<ResponseHead, RequestError>;
    async fn read_body_chunk(&mut self, origin: &str) -> Result<Vec<u8>, RequestError>;
}

/// A concrete, owned TCP (optionally TLS) connection plus the
/// leftover-byte bookkeeping needed to parse an HTTP/1.1 response head
/// that may span several reads.
pub struct TcpTransport {
    stream: Stream,
    leftover: Vec<u8>,
}

impl TcpTransport {
    /// Resolve the host, open a TCP connection, and upgrade to TLS if
    /// the URL scheme calls for it.
    pub async fn connect(config: &RequestConfig, origin: &str) -> Result<Self, RequestError> {
        let host = config.url.host_str().unwrap_or("").to_string();
        let port = config
            .url
            .port_or_known_default()
            .unwrap_or(if config.url.scheme() == "https" { 443 } else { 80 });
        let is_tls = config.url.scheme() == "https";

        let addr = timeout(CONNECT_GRACE, tokio::net::lookup_host((host.as_str(), port)))
            .await
            .map_err(|_| RequestError::NetworkTimedOut {
                origin: origin.to_string(),
            })?
            .map_err(|e| map_resolution_error(origin, &e))?
            .next()
            .ok_or_else(|| RequestError::HostnameNotFound {
                origin: origin.to_string(),
            })?;

        let tcp = timeout(CONNECT_GRACE, TcpStream::connect(addr))
            .await
            .map_err(|_| RequestError::NetworkTimedOut {
                origin: origin.to_string(),
            })?
            .map_err(|e| map_io_error(origin, &e))?;

        let stream = if is_tls {
            let connector = tls_connector();
            let server_name = rustls_pki_types::ServerName::try_from(host.clone())
                .map_err(|e| map_tls_error(origin, e))?
                .to_owned();
            let tls = timeout(CONNECT_GRACE, connector.connect(server_name, tcp))
                .await
                .map_err(|_| RequestError::NetworkTimedOut {
                    origin: origin.to_string(),
                })?
                .map_err(|e| map_tls_error(origin, e))?;
            Stream::Tls(Box::new(tls))
        } else {
            Stream::Plain(tcp)
        };

        Ok(Self {
            stream,
            leftover: Vec::new(),
        })
    }

    /// Read and parse the response head, buffering any body bytes that
    /// arrive in the same read past the blank line for the first
    /// `read_body_chunk` call.
    async fn read_head_impl(&mut self, origin: &str) -> Result<ResponseHead, RequestError> {
        let mut buf = std::mem::take(&mut self.leftover);
        let mut scratch = [0u8; READ_CHUNK_SIZE];

        loop {
            let mut headers_storage = [httparse::EMPTY_HEADER; 64];
            let mut response = httparse::Response::new(&mut headers_storage);
            match response
                .parse(&buf)
                .map_err(|_| RequestError::MalformedResponseHead {
                    origin: origin.to_string(),
                })?
            {
                httparse::Status::Complete(consumed) => {
                    let status_code = response.code.ok_or_else(|| RequestError::MalformedResponseHead {
                        origin: origin.to_string(),
                    })?;
                    let status_message = response.reason.unwrap_or("").to_string();
                    let mut headers = Headers::new();
                    for h in response.headers.iter() {
                        headers.insert(h.name.to_string(), String::from_utf8_lossy(h.value).into_owned());
                    }
                    self.leftover = buf.split_off(consumed);
                    return Ok(ResponseHead {
                        status_code,
                        status_message,
                        headers,
                    });
                }
                httparse::Status::Partial => {
                    let n = self
                        .stream
                        .read(&mut scratch)
                        .await
                        .map_err(|e| map_io_error(origin, &e))?;
                    if n == 0 {
                        return Err(RequestError::NetworkConnectionReset {
                            origin: origin.to_string(),
                        });
                    }
                    buf.extend_from_slice(&scratch[..n]);
                }
            }
        }
    }

    /// Read the next body chunk. An empty return means end-of-stream.
    async fn read_body_chunk_impl(&mut self, origin: &str) -> Result<Vec<u8>, RequestError> {
        if !self.leftover.is_empty() {
            return Ok(std::mem::take(&mut self.leftover));
        }
        let mut scratch = vec![0u8; READ_CHUNK_SIZE];
        let n = self
            .stream
            .read(&mut scratch)
            .await
            .map_err(|e| map_io_error(origin, &e))?;
        scratch.truncate(n);
        Ok(scratch)
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn write_head(&mut self, head: &[u8], origin: &str) -> Result<(), RequestError> {
        self.stream
            .write_all(head)
            .await
            .map_err(|e| map_io_error(origin, &e))
    }

    /// Write one bounded body chunk. The `.await` here *is* the
    /// backpressure suspension point: it only resolves once the OS
    /// socket buffer has accepted the bytes.
    async fn write_body_chunk(&mut self, chunk: &[u8], origin: &str) -> Result<(), RequestError> {
        self.stream
            .write_all(chunk)
            .await
            .map_err(|e| map_io_error(origin, &e))
    }

    /// Half-close the write side once the head and body are fully
    /// written. Read side stays open for the response.
    async fn finish_write(&mut self, origin: &str) -> Result<(), RequestError> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| map_io_error(origin, &e))
    }

    async fn read_head(&mut self, origin: &str) -> Result<ResponseHead, RequestError> {
        self.read_head_impl(origin).await
    }

    async fn read_body_chunk(&mut self, origin: &str) -> Result<Vec<u8>, RequestError> {
        self.read_body_chunk_impl(origin).await
    }
}

fn tls_connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Serialize the request line, headers, and (when present) an explicit
/// `Content-Length`/`Connection: close` into the bytes written before
/// any body.
pub fn build_request_head(config: &RequestConfig, content_length: Option<usize>) -> Vec<u8> {
    let mut head = Vec::new();
    let path = {
        let mut p = config.url.path().to_string();
        if p.is_empty() {
            p.push('/');
        }
        if let Some(query) = config.url.query() {
            p.push('?');
            p.push_str(query);
        }
        p
    };

    head.extend_from_slice(format!("{} {} HTTP/1.1\r\n", method_str(config.method), path).as_bytes());

    let host_header = match config.url.port() {
        Some(port) => format!("{}:{}", config.url.host_str().unwrap_or(""), port),
        None => config.url.host_str().unwrap_or("").to_string(),
    };
    if config.headers.get("host").is_none() {
        head.extend_from_slice(format!("Host: {host_header}\r\n").as_bytes());
    }
    if config.headers.get("connection").is_none() {
        head.extend_from_slice(b"Connection: close\r\n");
    }
    for (name, value) in config.headers.iter() {
        head.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    if config.headers.get("content-length").is_none() {
        if let Some(len) = content_length {
            head.extend_from_slice(format!("Content-Length: {len}\r\n").as_bytes());
        }
    }
    head.extend_from_slice(b"\r\n");
    head
}

fn method_str(method: Method) -> &'static str {
    method.as_str()
}
