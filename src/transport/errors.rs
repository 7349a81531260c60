//! Maps transport-layer system errors onto the public error taxonomy.
//!
//! Every failure that carries a recognizable OS error code is mapped to
//! a named kind; anything else becomes [`RequestError::Unknown`].

use std::io;

use crate::error::RequestError;

/// Map an I/O error observed while writing or reading the socket.
pub fn map_io_error(origin: &str, err: &io::Error) -> RequestError {
    use io::ErrorKind::*;
    match err.kind() {
        ConnectionReset => RequestError::NetworkConnectionReset {
            origin: origin.to_string(),
        },
        BrokenPipe => RequestError::BrokenPipe {
            origin: origin.to_string(),
        },
        ConnectionRefused => RequestError::ConnectionRefused {
            origin: origin.to_string(),
        },
        ConnectionAborted => RequestError::ConnectionAborted {
            origin: origin.to_string(),
        },
        TimedOut => RequestError::NetworkTimedOut {
            origin: origin.to_string(),
        },
        HostUnreachable => RequestError::HostUnreachable {
            origin: origin.to_string(),
        },
        NetworkDown | NetworkUnreachable => RequestError::NetworkDown {
            origin: origin.to_string(),
        },
        _ => RequestError::unknown(origin, err),
    }
}

/// Map a failure that happened specifically while resolving the host
/// name (DNS), which doesn't carry a useful `ErrorKind` of its own.
pub fn map_resolution_error(origin: &str, _err: &io::Error) -> RequestError {
    RequestError::HostnameNotFound {
        origin: origin.to_string(),
    }
}

/// Map a TLS handshake failure.
pub fn map_tls_error(origin: &str, err: impl std::fmt::Display) -> RequestError {
    RequestError::TlsHandshakeFailed {
        origin: origin.to_string(),
        reason: err.to_string(),
    }
}
