//! TCP transport layer for ISO-on-TCP communication.
//!
//! This module provides the [`TcpTransport`] struct which handles low-level
//! TCP communication with S7 PLCs. The transport layer is completely
//! separated from the protocol layer—it only knows about sockets and bytes.
//!
//! # Design
//!
//! The transport layer follows these principles:
//!
//! - **Protocol agnostic** - Handles only byte transmission, no S7 knowledge
//! - **Synchronous** - Blocking read/write with a per-call timeout
//! - **All-or-error** - Either the full byte count is transferred or an
//!   error is returned; partial reads never leak to callers
//!
//! # Constants
//!
//! - [`DEFAULT_ISO_PORT`] - Default ISO-TSAP TCP port (102)
//! - [`DEFAULT_TIMEOUT`] - Default timeout (2 seconds)
//!
//! # Example
//!
//! The transport is typically driven through a
//! [`Connection`](crate::Connection), but can be used directly:
//!
//! ```no_run
//! use s7comm::TcpTransport;
//! use std::time::Duration;
//!
//! let mut transport = TcpTransport::connect(
//!     "192.168.1.10:102".parse().unwrap(),
//!     Duration::from_secs(2),
//! ).unwrap();
//!
//! let mut header = [0u8; 4];
//! transport.read_exact(&mut header, Duration::from_secs(2)).unwrap();
//! ```

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Result, S7Error};

/// Default ISO-TSAP TCP port.
pub const DEFAULT_ISO_PORT: u16 = 102;

/// Default timeout for transport operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP transport for ISO-on-TCP communication.
///
/// Handles synchronous byte-exact reads and writes with a wall-clock timeout
/// applied per call. The protocol layer doesn't know about sockets; the
/// socket layer doesn't know S7.
///
/// The transport never closes the stream on protocol failures; its lifetime
/// is the caller's responsibility end-to-end.
pub struct TcpTransport {
    stream: TcpStream,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl TcpTransport {
    /// Opens a TCP connection to the specified PLC address.
    ///
    /// # Arguments
    ///
    /// * `plc_addr` - Socket address of the PLC (IP:port, conventionally port 102)
    /// * `timeout` - Bound for the TCP connect itself
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the connection cannot be established, or
    /// `S7Error::Timeout` if it does not complete within the bound.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7comm::TcpTransport;
    /// use std::time::Duration;
    ///
    /// let transport = TcpTransport::connect(
    ///     "192.168.1.10:102".parse().unwrap(),
    ///     Duration::from_secs(2),
    /// ).unwrap();
    /// ```
    pub fn connect(plc_addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = if timeout.is_zero() {
            TcpStream::connect(plc_addr)?
        } else {
            TcpStream::connect_timeout(&plc_addr, timeout).map_err(map_io_error)?
        };
        // Request/response in lock-step; never batch small writes
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }

    /// Wraps an already-open TCP stream.
    ///
    /// Use this when the socket is created and owned by the caller rather
    /// than by this crate.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use s7comm::TcpTransport;
    /// use std::net::TcpStream;
    ///
    /// let stream = TcpStream::connect("192.168.1.10:102").unwrap();
    /// let transport = TcpTransport::from_stream(stream);
    /// ```
    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            read_timeout: None,
            write_timeout: None,
        }
    }

    /// Reads exactly `buf.len()` bytes within the given timeout.
    ///
    /// The timeout is a single wall-clock bound for the whole call, not
    /// per-fragment: the socket timeout is re-armed with the remaining
    /// window before every fragment, so a peer trickling bytes cannot
    /// stretch the bound. A zero timeout blocks indefinitely.
    ///
    /// # Errors
    ///
    /// - `S7Error::Timeout` if the bound expires first
    /// - `S7Error::ConnectionClosed` if the peer closes mid-read
    /// - `S7Error::Io` for any other I/O failure
    pub fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            self.apply_read_timeout(timeout)?;
            self.stream.read_exact(buf).map_err(map_io_error)?;
            trace!(bytes = buf.len(), "read from transport");
            return Ok(());
        }

        let deadline = Instant::now() + timeout;
        let mut filled = 0;
        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(S7Error::Timeout);
            }
            self.apply_read_timeout(remaining)?;
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => return Err(S7Error::ConnectionClosed),
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(map_io_error(e)),
            }
        }
        trace!(bytes = buf.len(), "read from transport");
        Ok(())
    }

    /// Writes all of `buf` within the given timeout.
    ///
    /// The timeout is a single wall-clock bound for the whole call, not
    /// per-fragment, mirroring [`TcpTransport::read_exact`]. A zero
    /// timeout blocks indefinitely.
    ///
    /// # Errors
    ///
    /// - `S7Error::Timeout` if the bound expires first
    /// - `S7Error::ConnectionClosed` if the peer closes mid-write
    /// - `S7Error::Io` for any other I/O failure
    pub fn write_all(&mut self, buf: &[u8], timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            self.apply_write_timeout(timeout)?;
            self.stream.write_all(buf).map_err(map_io_error)?;
            trace!(bytes = buf.len(), "wrote to transport");
            return Ok(());
        }

        let deadline = Instant::now() + timeout;
        let mut written = 0;
        while written < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(S7Error::Timeout);
            }
            self.apply_write_timeout(remaining)?;
            match self.stream.write(&buf[written..]) {
                Ok(0) => return Err(S7Error::ConnectionClosed),
                Ok(n) => written += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(map_io_error(e)),
            }
        }
        trace!(bytes = buf.len(), "wrote to transport");
        Ok(())
    }

    /// Returns the remote PLC address, if the stream is still connected.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    /// Returns a reference to the underlying stream.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Consumes the transport and returns the underlying stream.
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }

    fn apply_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        let wanted = if timeout.is_zero() { None } else { Some(timeout) };
        if self.read_timeout != wanted {
            self.stream.set_read_timeout(wanted)?;
            self.read_timeout = wanted;
        }
        Ok(())
    }

    fn apply_write_timeout(&mut self, timeout: Duration) -> Result<()> {
        let wanted = if timeout.is_zero() { None } else { Some(timeout) };
        if self.write_timeout != wanted {
            self.stream.set_write_timeout(wanted)?;
            self.write_timeout = wanted;
        }
        Ok(())
    }
}

fn map_io_error(e: std::io::Error) -> S7Error {
    match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => S7Error::Timeout,
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe => S7Error::ConnectionClosed,
        _ => S7Error::Io(e),
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer_addr", &self.stream.peer_addr().ok())
            .field("local_addr", &self.stream.local_addr().ok())
            .finish()
    }
}
