//! The TLS connection and the readable-or-timeout wait.
//!
//! The rest of the logger treats the connection as an opaque bidirectional
//! byte stream; this module is the only place that knows it is TLS over TCP.

use std::io;
use std::net::TcpStream;
use std::os::fd::BorrowedFd;

use native_tls::{TlsConnector, TlsStream};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use thiserror::Error;

/// Errors from establishing the connection.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("TLS handshake with {server} failed: {details}")]
    Handshake { server: String, details: String },
}

/// Outcome of waiting on the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The socket has bytes to read (or has been closed).
    Ready,
    /// The timeout elapsed first.
    TimedOut,
}

/// Opens a TLS stream to `server:port`.
pub fn connect(server: &str, port: u16) -> Result<TlsStream<TcpStream>, NetError> {
    let tcp = TcpStream::connect((server, port))?;
    let connector = TlsConnector::new()?;
    let stream = connector
        .connect(server, tcp)
        .map_err(|e| NetError::Handshake {
            server: server.to_string(),
            details: e.to_string(),
        })?;
    Ok(stream)
}

/// Blocks until `fd` is readable or `timeout_ms` elapses.
pub fn wait_readable(fd: BorrowedFd<'_>, timeout_ms: u16) -> io::Result<Wait> {
    let timeout = PollTimeout::from(timeout_ms);
    loop {
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, timeout) {
            Ok(0) => return Ok(Wait::TimedOut),
            Ok(_) => return Ok(Wait::Ready),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(io::Error::from(e)),
        }
    }
}
