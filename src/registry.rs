//! Opaque-handle registry for language bindings.
//!
//! Foreign callers cannot hold Rust values across a language boundary, so the
//! registry owns every transport, interface, and connection itself and hands
//! out opaque `u32` handles in their place. Each call looks its handles up
//! again; a stale or mistyped handle fails with [`S7Error::InvalidHandle`]
//! instead of touching freed state.
//!
//! Rust callers talking to a PLC directly should use [`Connection`] and skip
//! the registry; it exists for the handle-based calling convention bindings
//! need.
//!
//! # Example
//!
//! ```no_run
//! use s7comm::{Area, Registry};
//!
//! let mut registry = Registry::new();
//!
//! let socket = registry.open_socket("192.168.0.10:102".parse().unwrap())?;
//! let iface = registry.new_interface("IF1", socket)?;
//! registry.set_timeout(iface, 5_000_000)?;
//!
//! let plc = registry.new_connection(iface, 2, 0, 2)?;
//! registry.connect_plc(plc)?;
//!
//! let bytes = registry.read_bytes(plc, Area::DataBlock, 150, 0, 24)?;
//! assert_eq!(bytes.len(), 24);
//!
//! registry.disconnect_plc(plc)?;
//! registry.close_socket(socket)?;
//! # Ok::<(), s7comm::S7Error>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::debug;

use crate::area::Area;
use crate::client::{Connection, ConnectionParams, Interface};
use crate::error::{Result, S7Error};
use crate::transport::{TcpTransport, DEFAULT_TIMEOUT};

struct InterfaceEntry {
    interface: Interface,
    socket: u32,
}

struct ConnectionEntry {
    connection: Connection,
    interface: u32,
}

/// Owner of transports, interfaces, and connections addressed by handle.
///
/// Handles are allocated from one counter, so a handle names exactly one
/// object of one kind for the registry's lifetime; passing a socket handle
/// where a connection handle belongs fails like any other stale handle.
///
/// Closing a socket leaves interfaces and connections built on it in place;
/// their next operation fails with [`S7Error::InvalidHandle`] naming the
/// closed socket.
pub struct Registry {
    sockets: HashMap<u32, TcpTransport>,
    interfaces: HashMap<u32, InterfaceEntry>,
    connections: HashMap<u32, ConnectionEntry>,
    next_handle: u32,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sockets: HashMap::new(),
            interfaces: HashMap::new(),
            connections: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Opens a TCP connection to the device and returns its handle.
    ///
    /// The connect itself uses the default timeout; per-operation timeouts
    /// come from the interface created over this socket.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Timeout` or `S7Error::Io` if the connection cannot
    /// be established.
    pub fn open_socket(&mut self, addr: SocketAddr) -> Result<u32> {
        let transport = TcpTransport::connect(addr, DEFAULT_TIMEOUT)?;
        let handle = self.allocate();
        self.sockets.insert(handle, transport);
        debug!(handle, %addr, "socket opened");
        Ok(handle)
    }

    /// Closes a socket and releases its handle.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` if the handle does not name a live
    /// socket.
    pub fn close_socket(&mut self, socket: u32) -> Result<()> {
        self.sockets
            .remove(&socket)
            .ok_or(S7Error::InvalidHandle { handle: socket })?;
        debug!(handle = socket, "socket closed");
        Ok(())
    }

    /// Creates an interface over an open socket and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` if the socket handle is not live.
    pub fn new_interface(&mut self, name: impl Into<String>, socket: u32) -> Result<u32> {
        if !self.sockets.contains_key(&socket) {
            return Err(S7Error::InvalidHandle { handle: socket });
        }
        let interface = Interface::new(name);
        let handle = self.allocate();
        debug!(handle, name = interface.name(), "interface created");
        self.interfaces
            .insert(handle, InterfaceEntry { interface, socket });
        Ok(handle)
    }

    /// Sets an interface timeout, given in microseconds.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` if the interface handle is not live.
    pub fn set_timeout(&mut self, interface: u32, microseconds: u64) -> Result<()> {
        let entry = self
            .interfaces
            .get_mut(&interface)
            .ok_or(S7Error::InvalidHandle { handle: interface })?;
        entry
            .interface
            .set_timeout(Duration::from_micros(microseconds));
        Ok(())
    }

    /// Creates a disconnected connection on an interface and returns its
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` if the interface handle is not live.
    pub fn new_connection(&mut self, interface: u32, mpi: u8, rack: u8, slot: u8) -> Result<u32> {
        if !self.interfaces.contains_key(&interface) {
            return Err(S7Error::InvalidHandle { handle: interface });
        }
        let params = ConnectionParams::new(rack, slot).with_mpi(mpi);
        let handle = self.allocate();
        debug!(handle, rack, slot, "connection created");
        self.connections.insert(
            handle,
            ConnectionEntry {
                connection: Connection::new(params),
                interface,
            },
        );
        Ok(handle)
    }

    /// Establishes the PLC session behind a connection handle.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` for a stale handle, otherwise the
    /// errors of [`Connection::connect`].
    pub fn connect_plc(&mut self, connection: u32) -> Result<()> {
        let (iface, conn, transport) = self.session(connection)?;
        conn.connect(iface, transport)
    }

    /// Ends the PLC session behind a connection handle.
    ///
    /// The connection and its handle stay registered and may connect again.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` if the connection handle is not live.
    pub fn disconnect_plc(&mut self, connection: u32) -> Result<()> {
        let entry = self
            .connections
            .get_mut(&connection)
            .ok_or(S7Error::InvalidHandle { handle: connection })?;
        entry.connection.disconnect()
    }

    /// Reads a byte range and returns a copy of the received payload.
    ///
    /// The bytes also stay in the connection's result buffer, so the typed
    /// accessors reached through [`Registry::connection`] decode the same
    /// read.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` for a stale handle, otherwise the
    /// errors of [`Connection::read_bytes`].
    pub fn read_bytes(
        &mut self,
        connection: u32,
        area: Area,
        db_number: u16,
        start: u32,
        length: usize,
    ) -> Result<Vec<u8>> {
        let (iface, conn, transport) = self.session(connection)?;
        let read = conn.read_bytes(iface, transport, area, db_number, start, length)?;
        Ok(conn.buffer().get_bytes(0, read)?.to_vec())
    }

    /// Writes a byte range.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` for a stale handle, otherwise the
    /// errors of [`Connection::write_bytes`].
    pub fn write_bytes(
        &mut self,
        connection: u32,
        area: Area,
        db_number: u16,
        start: u32,
        data: &[u8],
    ) -> Result<()> {
        let (iface, conn, transport) = self.session(connection)?;
        conn.write_bytes(iface, transport, area, db_number, start, data)
    }

    /// Sets a single bit to 1.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` for a stale handle, otherwise the
    /// errors of [`Connection::set_bit`].
    pub fn set_bit(
        &mut self,
        connection: u32,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        bit_offset: u8,
    ) -> Result<()> {
        let (iface, conn, transport) = self.session(connection)?;
        conn.set_bit(iface, transport, area, db_number, byte_offset, bit_offset)
    }

    /// Clears a single bit to 0.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` for a stale handle, otherwise the
    /// errors of [`Connection::clr_bit`].
    pub fn clr_bit(
        &mut self,
        connection: u32,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        bit_offset: u8,
    ) -> Result<()> {
        let (iface, conn, transport) = self.session(connection)?;
        conn.clr_bit(iface, transport, area, db_number, byte_offset, bit_offset)
    }

    /// Returns the interface behind a handle.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` if the interface handle is not live.
    pub fn interface(&self, interface: u32) -> Result<&Interface> {
        self.interfaces
            .get(&interface)
            .map(|entry| &entry.interface)
            .ok_or(S7Error::InvalidHandle { handle: interface })
    }

    /// Returns the connection behind a handle.
    ///
    /// Gives access to the session state and to the typed accessors over the
    /// most recent read.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidHandle` if the connection handle is not live.
    pub fn connection(&self, connection: u32) -> Result<&Connection> {
        self.connections
            .get(&connection)
            .map(|entry| &entry.connection)
            .ok_or(S7Error::InvalidHandle { handle: connection })
    }

    fn allocate(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Resolves a connection handle to the borrows one operation needs.
    fn session(
        &mut self,
        connection: u32,
    ) -> Result<(&Interface, &mut Connection, &mut TcpTransport)> {
        let entry = self
            .connections
            .get_mut(&connection)
            .ok_or(S7Error::InvalidHandle { handle: connection })?;
        let iface_entry = self
            .interfaces
            .get(&entry.interface)
            .ok_or(S7Error::InvalidHandle {
                handle: entry.interface,
            })?;
        let transport = self
            .sockets
            .get_mut(&iface_entry.socket)
            .ok_or(S7Error::InvalidHandle {
                handle: iface_entry.socket,
            })?;
        Ok((&iface_entry.interface, &mut entry.connection, transport))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sockets", &self.sockets.len())
            .field("interfaces", &self.interfaces.len())
            .field("connections", &self.connections.len())
            .finish()
    }
}
