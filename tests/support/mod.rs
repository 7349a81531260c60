//! A raw-socket loopback fixture server for the end-to-end scenarios.
//! Deliberately hand-rolled rather than built on a mocking crate: the
//! scenarios it simulates (silent RST, silent hang) are socket-level
//! behaviors no HTTP-aware mock framework exposes a knob for.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const PATTERN: &str = "This is a pattern!";

/// Repeats [`PATTERN`] until the buffer reaches exactly `len` bytes.
pub fn pattern_body(len: usize) -> Vec<u8> {
    PATTERN.as_bytes().iter().copied().cycle().take(len).collect()
}

/// Starts the fixture server on an OS-assigned loopback port and
/// returns its address. The server runs until the test process exits;
/// each accepted connection is handled on its own task.
pub async fn spawn() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(handle(socket));
        }
    });

    addr
}

async fn handle(mut socket: TcpStream) {
    let mut buf = Vec::new();
    let mut scratch = [0u8; 8192];
    let path = loop {
        let mut headers_storage = [httparse::EMPTY_HEADER; 64];
        let mut request = httparse::Request::new(&mut headers_storage);
        match request.parse(&buf) {
            Ok(httparse::Status::Complete(consumed)) => {
                let path = request.path.unwrap_or("/").to_string();
                let content_length = request
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("content-length"))
                    .and_then(|h| std::str::from_utf8(h.value).ok())
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                let body_so_far = buf.len() - consumed;
                break Some((path, content_length, body_so_far, buf.split_off(consumed)));
            }
            Ok(httparse::Status::Partial) => {
                let Ok(n) = socket.read(&mut scratch).await else {
                    return;
                };
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&scratch[..n]);
            }
            Err(_) => return,
        }
    };

    let Some((path, content_length, body_so_far, mut body)) = path else {
        return;
    };

    while body.len() < content_length {
        let Ok(n) = socket.read(&mut scratch).await else {
            break;
        };
        if n == 0 {
            break;
        }
        body.extend_from_slice(&scratch[..n]);
    }
    let _ = body_so_far;

    match path.as_str() {
        "/silentrejection" => {
            let _ = socket.set_linger(Some(Duration::ZERO));
            drop(socket);
        }
        "/silenttimeout" => {
            // Hold the connection open without ever responding.
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        "/checkpattern" => {
            let mut response = Vec::new();
            response.extend_from_slice(b"HTTP/1.1 200 OK\r\n");
            response.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            response.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
            response.extend_from_slice(&body);
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        }
        "/silentresponse" => {
            let response = b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n";
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        }
        _ => {
            let response = b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        }
    }
}
