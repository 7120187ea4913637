//! PLC sessions: interface configuration, connection state, and operations.
//!
//! This module holds the two halves of a session:
//!
//! - [`Interface`] describes one transport endpoint: a name for logging, the
//!   protocol variant, and the timeout applied to every I/O call.
//! - [`Connection`] is one logical session on a CPU, addressed by rack and
//!   slot. It owns the session state, the negotiated PDU length, the PDU
//!   reference counter, and the result buffer reads decode from.
//!
//! # Ownership
//!
//! The interface owns configuration, not the socket. Every operation borrows
//! the [`TcpTransport`] mutably for its full duration, so two operations on
//! one transport cannot overlap; the protocol has no multiplexing, and this
//! makes the one-request-in-flight rule a compile-time property. The socket
//! is never closed by a connection; its lifetime belongs to the caller.
//!
//! # Example
//!
//! ```no_run
//! use s7comm::{Area, Connection, ConnectionParams, Interface, TcpTransport};
//!
//! let iface = Interface::new("plant-floor");
//! let addr = "192.168.0.10:102".parse().unwrap();
//! let mut transport = TcpTransport::connect(addr, iface.timeout())?;
//!
//! let mut conn = Connection::new(ConnectionParams::new(0, 2));
//! conn.connect(&iface, &mut transport)?;
//!
//! // Read 4 bytes from DB18 and decode them as a REAL
//! conn.read_bytes(&iface, &mut transport, Area::DataBlock, 18, 0, 4)?;
//! let value = conn.get_f32(0)?;
//!
//! conn.disconnect()?;
//! # Ok::<(), s7comm::S7Error>(())
//! ```

use std::time::Duration;

use tracing::{debug, trace};

use crate::area::Area;
use crate::buffer::{ResultBuffer, RESULT_BUFFER_CAPACITY};
use crate::command::{ReadRequest, RequestItem, SetupRequest, WriteRequest, PROPOSED_PDU_LENGTH};
use crate::cotp::{self, ConnectRequest, ConnectionType, TPKT_HEADER_SIZE};
use crate::error::{Result, S7Error};
use crate::response::{AckData, DataItem, ACK_HEADER_SIZE};
use crate::transport::{TcpTransport, DEFAULT_TIMEOUT};

/// Default MPI address of an S7 CPU.
pub const DEFAULT_MPI_ADDRESS: u8 = 2;

/// Smallest PDU length a CPU may grant; real devices negotiate 240 or more.
const MIN_PDU_LENGTH: u16 = 240;

// Header and parameter overhead per PDU, subtracted from the negotiated
// length to size transfer chunks.
const READ_PDU_OVERHEAD: usize = 18;
const WRITE_PDU_OVERHEAD: usize = 28;

/// Protocol variant carried by an [`Interface`].
///
/// Only ISO-on-TCP is implemented. The serial variants exist so that
/// configuration written for multi-transport installations keeps its shape;
/// connecting through them fails cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolVariant {
    /// S7 over ISO-on-TCP (RFC 1006), TCP port 102.
    #[default]
    IsoTcp,
    /// MPI through a serial adapter. Named only; rejected at connect.
    Mpi,
    /// PPI through a serial adapter. Named only; rejected at connect.
    Ppi,
}

/// Configuration of one transport endpoint.
///
/// An interface is created once and shared read-only by every connection
/// built on it. It does not own the socket; see the
/// [module documentation](self).
#[derive(Debug, Clone)]
pub struct Interface {
    name: String,
    variant: ProtocolVariant,
    timeout: Duration,
}

impl Interface {
    /// Creates an ISO-TCP interface with the default timeout.
    ///
    /// The name tags every log line this interface produces, so multi-PLC
    /// callers can tell sessions apart.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::Interface;
    ///
    /// let iface = Interface::new("line-3");
    /// assert_eq!(iface.name(), "line-3");
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: ProtocolVariant::IsoTcp,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the protocol variant.
    pub fn with_variant(mut self, variant: ProtocolVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets a custom timeout (default is 2 seconds).
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use s7comm::Interface;
    ///
    /// let iface = Interface::new("line-3").with_timeout(Duration::from_secs(5));
    /// assert_eq!(iface.timeout(), Duration::from_secs(5));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Changes the timeout of an existing interface.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Returns the interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the protocol variant.
    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    /// Returns the timeout applied to every I/O call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Addressing parameters of one logical PLC session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionParams {
    /// MPI address of the CPU; unused over ISO-TCP, retained for serial parity.
    pub mpi: u8,
    /// Rack number of the CPU (0-7).
    pub rack: u8,
    /// Slot number of the CPU (0-31).
    pub slot: u8,
    /// Communication resource the session binds to.
    pub connection_type: ConnectionType,
}

impl ConnectionParams {
    /// Creates parameters for the given rack and slot.
    ///
    /// Uses the default MPI address (2) and a PG connection.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::{ConnectionParams, ConnectionType};
    ///
    /// let params = ConnectionParams::new(0, 2);
    /// assert_eq!(params.connection_type, ConnectionType::Pg);
    /// ```
    pub fn new(rack: u8, slot: u8) -> Self {
        Self {
            mpi: DEFAULT_MPI_ADDRESS,
            rack,
            slot,
            connection_type: ConnectionType::default(),
        }
    }

    /// Sets a custom MPI address.
    pub fn with_mpi(mut self, mpi: u8) -> Self {
        self.mpi = mpi;
        self
    }

    /// Sets the communication resource type (default is PG).
    pub fn with_connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = connection_type;
        self
    }
}

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session; the state every connection starts in and falls back to.
    Disconnected,
    /// COTP handshake in progress.
    Connecting,
    /// Transport connected, PDU length negotiation in progress.
    Negotiating,
    /// Session established; read/write operations are accepted.
    Ready,
}

/// One logical session on a CPU.
///
/// Operations require the [`ConnectionState::Ready`] state, reached through
/// [`Connection::connect`]. Transport and protocol failures drop the
/// connection back to [`ConnectionState::Disconnected`] and empty the result
/// buffer; errors the PLC reports about a particular request leave the
/// session intact.
#[derive(Debug)]
pub struct Connection {
    params: ConnectionParams,
    state: ConnectionState,
    pdu_length: u16,
    pdu_ref: u16,
    buffer: ResultBuffer,
}

impl Connection {
    /// Creates a disconnected connection with the given parameters.
    pub fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            state: ConnectionState::Disconnected,
            pdu_length: 0,
            pdu_ref: 0,
            buffer: ResultBuffer::new(),
        }
    }

    /// Returns the addressing parameters.
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the negotiated PDU length, or 0 before negotiation.
    pub fn pdu_length(&self) -> u16 {
        self.pdu_length
    }

    /// Returns the result buffer holding the most recent read.
    pub fn buffer(&self) -> &ResultBuffer {
        &self.buffer
    }

    /// Establishes the session: COTP handshake, then PDU length negotiation.
    ///
    /// On success the state is [`ConnectionState::Ready`]; on any failure it
    /// is [`ConnectionState::Disconnected`] and the transport should be
    /// considered unusable until reconnected by the caller.
    ///
    /// # Errors
    ///
    /// - `S7Error::InvalidParameter` if the connection is not disconnected,
    ///   the interface variant is not ISO-TCP, or rack/slot are out of range
    /// - `S7Error::ConnectionRejected` if the device refuses the COTP request
    /// - transport and protocol errors from the handshake exchanges
    pub fn connect(&mut self, iface: &Interface, transport: &mut TcpTransport) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(S7Error::invalid_parameter(
                "connection",
                "connect requires a disconnected connection",
            ));
        }
        if iface.variant() != ProtocolVariant::IsoTcp {
            return Err(S7Error::invalid_parameter(
                "variant",
                format!("{:?} is not implemented, use ISO-TCP", iface.variant()),
            ));
        }

        self.state = ConnectionState::Connecting;
        match self.handshake(iface, transport) {
            Ok(pdu_length) => {
                self.pdu_length = pdu_length;
                self.state = ConnectionState::Ready;
                debug!(
                    interface = iface.name(),
                    rack = self.params.rack,
                    slot = self.params.slot,
                    pdu_length,
                    "PLC connection ready"
                );
                Ok(())
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    fn handshake(&mut self, iface: &Interface, transport: &mut TcpTransport) -> Result<u16> {
        let request = ConnectRequest::new(
            self.params.connection_type,
            self.params.rack,
            self.params.slot,
        )?;
        transport.write_all(&request.to_bytes(), iface.timeout())?;
        let body = read_frame(transport, iface.timeout())?;
        cotp::parse_connect_confirm(&body)?;
        debug!(interface = iface.name(), "COTP connection confirmed");

        self.state = ConnectionState::Negotiating;
        let pdu_ref = self.next_ref();
        let setup = SetupRequest::new(pdu_ref, PROPOSED_PDU_LENGTH);
        let ack = transact(transport, iface.timeout(), &setup.to_bytes(), pdu_ref)?;
        ack.check_errors()?;
        let pdu_length = ack.negotiated_pdu_length()?;
        if pdu_length < MIN_PDU_LENGTH {
            return Err(S7Error::malformed_frame(format!(
                "negotiated PDU length {} below the {} byte minimum",
                pdu_length, MIN_PDU_LENGTH
            )));
        }
        Ok(pdu_length)
    }

    /// Ends the session.
    ///
    /// Purely a state transition: the protocol needs no goodbye and the
    /// socket stays open for the caller. Safe to call repeatedly; a second
    /// call is a no-op.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            debug!(rack = self.params.rack, slot = self.params.slot, "PLC connection closed");
        }
        self.reset();
        Ok(())
    }

    /// Reads a byte range into the result buffer.
    ///
    /// Transfers longer than one PDU's usable payload are split into
    /// successive requests. On success the result buffer holds exactly the
    /// bytes read and the populated count is returned; on failure the buffer
    /// is left empty.
    ///
    /// For counters and timers `start` is the entry number and `length`
    /// must cover whole 2-byte entries.
    ///
    /// # Errors
    ///
    /// - `S7Error::NotConnected` if the session is not ready
    /// - `S7Error::InvalidParameter` if the length is zero, exceeds
    ///   [`RESULT_BUFFER_CAPACITY`], or does not fit the area
    /// - transport, protocol, and PLC errors from the exchange
    pub fn read_bytes(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        area: Area,
        db_number: u16,
        start: u32,
        length: usize,
    ) -> Result<usize> {
        self.ensure_ready()?;
        if length == 0 {
            return Err(S7Error::invalid_parameter(
                "length",
                "must be greater than 0",
            ));
        }
        if length > RESULT_BUFFER_CAPACITY {
            return Err(S7Error::invalid_parameter(
                "length",
                format!(
                    "{} bytes exceeds the {} byte result buffer",
                    length, RESULT_BUFFER_CAPACITY
                ),
            ));
        }
        let per_entry = matches!(area, Area::Counter | Area::Timer);
        if per_entry && length % 2 != 0 {
            return Err(S7Error::invalid_parameter(
                "length",
                "counter and timer transfers must cover whole 2-byte entries",
            ));
        }
        trace!(
            interface = iface.name(),
            %area,
            db_number,
            start,
            length,
            "read bytes"
        );

        self.buffer.invalidate();
        let chunk_limit = self.pdu_length as usize - READ_PDU_OVERHEAD;
        let mut payload = Vec::with_capacity(length);
        let mut offset = start;
        let mut remaining = length;
        while remaining > 0 {
            let mut chunk = remaining.min(chunk_limit);
            if per_entry {
                chunk &= !1;
            }
            let item = RequestItem::bytes(area, db_number, offset, chunk as u16)?;
            let data = self.read_single(iface, transport, item)?;
            if data.len() != chunk {
                self.reset();
                return Err(S7Error::unexpected_pdu(format!(
                    "read item returned {} bytes, expected {}",
                    data.len(),
                    chunk
                )));
            }
            payload.extend_from_slice(&data);
            let step = if per_entry { chunk / 2 } else { chunk };
            offset += step as u32;
            remaining -= chunk;
        }

        self.buffer.fill(&payload);
        Ok(payload.len())
    }

    /// Reads several independent items in one request.
    ///
    /// Returns one result per item in request order: per-item PLC rejections
    /// surface in their slot and do not fail the neighbors. The whole request
    /// and its response must fit a single PDU; items are not chunked.
    ///
    /// The result buffer is not involved; payloads are returned directly.
    ///
    /// # Errors
    ///
    /// - `S7Error::NotConnected` if the session is not ready
    /// - `S7Error::InvalidParameter` if the item list is empty, exceeds
    ///   [`MAX_ITEMS_PER_REQUEST`](crate::command::MAX_ITEMS_PER_REQUEST),
    ///   or does not fit the negotiated PDU
    /// - transport, protocol, and header-level PLC errors from the exchange
    pub fn read_multi(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        items: Vec<RequestItem>,
    ) -> Result<Vec<Result<Vec<u8>>>> {
        self.ensure_ready()?;
        let pdu_ref = self.next_ref();
        let request = ReadRequest::new(pdu_ref, items)?;
        let pdu = request.to_bytes();

        let pdu_length = self.pdu_length as usize;
        let response_size = ACK_HEADER_SIZE
            + 2
            + request
                .items()
                .iter()
                .map(|item| 4 + item.payload_len() + item.payload_len() % 2)
                .sum::<usize>();
        if pdu.len() > pdu_length || response_size > pdu_length {
            return Err(S7Error::invalid_parameter(
                "items",
                format!(
                    "request does not fit the negotiated {} byte PDU",
                    self.pdu_length
                ),
            ));
        }
        trace!(
            interface = iface.name(),
            items = request.items().len(),
            "read multiple items"
        );

        let expected = request.items().len();
        let ack = self.exchange(iface, transport, &pdu, pdu_ref)?;
        self.guard(ack.check_errors())?;
        let items = self.guard(ack.read_items(expected))?;
        Ok(items.into_iter().map(DataItem::into_result).collect())
    }

    /// Reads a single bit.
    ///
    /// # Errors
    ///
    /// - `S7Error::NotConnected` if the session is not ready
    /// - `S7Error::InvalidParameter` if the area has no bit access or the
    ///   bit position exceeds 7
    /// - transport, protocol, and PLC errors from the exchange
    pub fn read_bit(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        bit_offset: u8,
    ) -> Result<bool> {
        self.ensure_ready()?;
        let item = RequestItem::bit(area, db_number, byte_offset, bit_offset)?;
        trace!(
            interface = iface.name(),
            %area,
            db_number,
            byte_offset,
            bit_offset,
            "read bit"
        );

        let data = self.read_single(iface, transport, item)?;
        match data.first() {
            Some(&byte) => Ok(byte != 0),
            None => Err(S7Error::unexpected_pdu("bit read returned no payload")),
        }
    }

    /// Writes a byte range.
    ///
    /// Transfers longer than one PDU's usable payload are split into
    /// successive requests; a failure mid-way leaves earlier chunks written.
    /// The write status is aggregate: success, or the first failure.
    ///
    /// For counters and timers `start` is the entry number and the payload
    /// must cover whole 2-byte entries.
    ///
    /// # Errors
    ///
    /// - `S7Error::NotConnected` if the session is not ready
    /// - `S7Error::InvalidParameter` if the payload is empty or does not
    ///   fit the area
    /// - transport, protocol, and PLC errors from the exchange
    pub fn write_bytes(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        area: Area,
        db_number: u16,
        start: u32,
        data: &[u8],
    ) -> Result<()> {
        self.ensure_ready()?;
        if data.is_empty() {
            return Err(S7Error::invalid_parameter("data", "must not be empty"));
        }
        let per_entry = matches!(area, Area::Counter | Area::Timer);
        if per_entry && data.len() % 2 != 0 {
            return Err(S7Error::invalid_parameter(
                "data",
                "counter and timer transfers must cover whole 2-byte entries",
            ));
        }
        trace!(
            interface = iface.name(),
            %area,
            db_number,
            start,
            length = data.len(),
            "write bytes"
        );

        let chunk_limit = self.pdu_length as usize - WRITE_PDU_OVERHEAD;
        let mut offset = start;
        let mut remaining = data;
        while !remaining.is_empty() {
            let mut chunk = remaining.len().min(chunk_limit);
            if per_entry {
                chunk &= !1;
            }
            let item = RequestItem::bytes(area, db_number, offset, chunk as u16)?;
            let pdu_ref = self.next_ref();
            let request = WriteRequest::new(pdu_ref, item, remaining[..chunk].to_vec())?;
            let ack = self.exchange(iface, transport, &request.to_bytes(), pdu_ref)?;
            self.guard(ack.check_errors())?;
            self.guard(ack.write_status())?;
            let step = if per_entry { chunk / 2 } else { chunk };
            offset += step as u32;
            remaining = &remaining[chunk..];
        }
        Ok(())
    }

    /// Writes a single bit.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Connection::read_bit`].
    pub fn write_bit(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        bit_offset: u8,
        value: bool,
    ) -> Result<()> {
        self.ensure_ready()?;
        let item = RequestItem::bit(area, db_number, byte_offset, bit_offset)?;
        trace!(
            interface = iface.name(),
            %area,
            db_number,
            byte_offset,
            bit_offset,
            value,
            "write bit"
        );

        let pdu_ref = self.next_ref();
        let request = WriteRequest::new(pdu_ref, item, vec![value as u8])?;
        let ack = self.exchange(iface, transport, &request.to_bytes(), pdu_ref)?;
        self.guard(ack.check_errors())?;
        self.guard(ack.write_status())
    }

    /// Sets a single bit to 1.
    pub fn set_bit(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        bit_offset: u8,
    ) -> Result<()> {
        self.write_bit(iface, transport, area, db_number, byte_offset, bit_offset, true)
    }

    /// Clears a single bit to 0.
    pub fn clr_bit(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        area: Area,
        db_number: u16,
        byte_offset: u32,
        bit_offset: u8,
    ) -> Result<()> {
        self.write_bit(iface, transport, area, db_number, byte_offset, bit_offset, false)
    }

    /// Returns the byte at `offset` of the result buffer.
    pub fn get_u8(&self, offset: usize) -> Result<u8> {
        self.buffer.get_u8(offset)
    }

    /// Returns the byte at `offset` of the result buffer as a signed value.
    pub fn get_i8(&self, offset: usize) -> Result<i8> {
        self.buffer.get_i8(offset)
    }

    /// Decodes a big-endian `u16` at `offset` of the result buffer.
    pub fn get_u16(&self, offset: usize) -> Result<u16> {
        self.buffer.get_u16(offset)
    }

    /// Decodes a big-endian `i16` at `offset` of the result buffer.
    pub fn get_i16(&self, offset: usize) -> Result<i16> {
        self.buffer.get_i16(offset)
    }

    /// Decodes a big-endian `u32` at `offset` of the result buffer.
    pub fn get_u32(&self, offset: usize) -> Result<u32> {
        self.buffer.get_u32(offset)
    }

    /// Decodes a big-endian `i32` at `offset` of the result buffer.
    pub fn get_i32(&self, offset: usize) -> Result<i32> {
        self.buffer.get_i32(offset)
    }

    /// Decodes a big-endian `f32` at `offset` of the result buffer.
    pub fn get_f32(&self, offset: usize) -> Result<f32> {
        self.buffer.get_f32(offset)
    }

    /// Returns one bit of the byte at `offset` of the result buffer.
    pub fn get_bit(&self, offset: usize, bit: u8) -> Result<bool> {
        self.buffer.get_bit(offset, bit)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state != ConnectionState::Ready {
            return Err(S7Error::NotConnected);
        }
        Ok(())
    }

    /// Advances the wrapping PDU reference counter.
    fn next_ref(&mut self) -> u16 {
        self.pdu_ref = self.pdu_ref.wrapping_add(1);
        self.pdu_ref
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.pdu_length = 0;
        self.buffer.invalidate();
    }

    /// Drops the session when `result` carries a transport or protocol error.
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.drops_connection() {
                self.reset();
            }
        }
        result
    }

    fn exchange(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        pdu: &[u8],
        pdu_ref: u16,
    ) -> Result<AckData> {
        let result = transact(transport, iface.timeout(), pdu, pdu_ref);
        self.guard(result)
    }

    /// Issues a one-item read and extracts its payload.
    fn read_single(
        &mut self,
        iface: &Interface,
        transport: &mut TcpTransport,
        item: RequestItem,
    ) -> Result<Vec<u8>> {
        let pdu_ref = self.next_ref();
        let request = ReadRequest::new(pdu_ref, vec![item])?;
        let ack = self.exchange(iface, transport, &request.to_bytes(), pdu_ref)?;
        self.guard(ack.check_errors())?;
        let mut items = self.guard(ack.read_items(1))?;
        match items.pop() {
            Some(item) => item.into_result(),
            None => Err(S7Error::unexpected_pdu("read response carries no items")),
        }
    }
}

/// Reads one TPKT-framed packet and returns its body.
fn read_frame(transport: &mut TcpTransport, timeout: Duration) -> Result<Vec<u8>> {
    let mut header = [0u8; TPKT_HEADER_SIZE];
    transport.read_exact(&mut header, timeout)?;
    let body_len = cotp::tpkt_payload_len(&header)?;
    let mut body = vec![0u8; body_len];
    transport.read_exact(&mut body, timeout)?;
    Ok(body)
}

/// Sends one job PDU and returns the paired ack-data.
fn transact(
    transport: &mut TcpTransport,
    timeout: Duration,
    pdu: &[u8],
    pdu_ref: u16,
) -> Result<AckData> {
    transport.write_all(&cotp::frame_pdu(pdu), timeout)?;
    let body = read_frame(transport, timeout)?;
    let response = cotp::strip_dt_header(&body)?;
    let ack = AckData::from_pdu(response)?;
    ack.check_ref(pdu_ref)?;
    Ok(ack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};

    fn loopback_transport() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).unwrap();
        let (peer, _) = listener.accept().unwrap();
        (TcpTransport::from_stream(stream), peer)
    }

    #[test]
    fn test_interface_defaults() {
        let iface = Interface::new("IF1");

        assert_eq!(iface.name(), "IF1");
        assert_eq!(iface.variant(), ProtocolVariant::IsoTcp);
        assert_eq!(iface.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_interface_builders() {
        let mut iface = Interface::new("IF1")
            .with_variant(ProtocolVariant::Mpi)
            .with_timeout(Duration::from_millis(500));

        assert_eq!(iface.variant(), ProtocolVariant::Mpi);
        assert_eq!(iface.timeout(), Duration::from_millis(500));

        iface.set_timeout(Duration::from_secs(1));
        assert_eq!(iface.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_connection_params_defaults() {
        let params = ConnectionParams::new(0, 2);

        assert_eq!(params.mpi, DEFAULT_MPI_ADDRESS);
        assert_eq!(params.rack, 0);
        assert_eq!(params.slot, 2);
        assert_eq!(params.connection_type, ConnectionType::Pg);

        let params = ConnectionParams::new(1, 3)
            .with_mpi(5)
            .with_connection_type(ConnectionType::Op);
        assert_eq!(params.mpi, 5);
        assert_eq!(params.connection_type, ConnectionType::Op);
    }

    #[test]
    fn test_new_connection_is_disconnected() {
        let conn = Connection::new(ConnectionParams::new(0, 2));

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.pdu_length(), 0);
        assert!(conn.buffer().is_empty());
    }

    #[test]
    fn test_operations_require_ready_state() {
        let iface = Interface::new("IF1");
        let (mut transport, _peer) = loopback_transport();
        let mut conn = Connection::new(ConnectionParams::new(0, 2));

        assert!(matches!(
            conn.read_bytes(&iface, &mut transport, Area::DataBlock, 1, 0, 2),
            Err(S7Error::NotConnected)
        ));
        assert!(matches!(
            conn.write_bytes(&iface, &mut transport, Area::Flag, 0, 0, &[0x01]),
            Err(S7Error::NotConnected)
        ));
        assert!(matches!(
            conn.read_bit(&iface, &mut transport, Area::Flag, 0, 0, 1),
            Err(S7Error::NotConnected)
        ));
        assert!(matches!(
            conn.set_bit(&iface, &mut transport, Area::Flag, 0, 0, 1),
            Err(S7Error::NotConnected)
        ));
    }

    #[test]
    fn test_connect_rejects_serial_variants() {
        let iface = Interface::new("IF1").with_variant(ProtocolVariant::Ppi);
        let (mut transport, _peer) = loopback_transport();
        let mut conn = Connection::new(ConnectionParams::new(0, 2));

        assert!(matches!(
            conn.connect(&iface, &mut transport),
            Err(S7Error::InvalidParameter { .. })
        ));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut conn = Connection::new(ConnectionParams::new(0, 2));

        assert!(conn.disconnect().is_ok());
        assert!(conn.disconnect().is_ok());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_pdu_ref_increments_and_wraps() {
        let mut conn = Connection::new(ConnectionParams::new(0, 2));

        assert_eq!(conn.next_ref(), 1);
        assert_eq!(conn.next_ref(), 2);

        conn.pdu_ref = u16::MAX;
        assert_eq!(conn.next_ref(), 0);
    }

    #[test]
    fn test_accessors_fail_on_empty_buffer() {
        let conn = Connection::new(ConnectionParams::new(0, 2));

        assert!(matches!(
            conn.get_u16(0),
            Err(S7Error::BufferOutOfRange { .. })
        ));
        assert!(matches!(
            conn.get_f32(0),
            Err(S7Error::BufferOutOfRange { .. })
        ));
    }

    #[test]
    fn test_read_length_validation() {
        let iface = Interface::new("IF1");
        let (mut transport, _peer) = loopback_transport();
        let mut conn = Connection::new(ConnectionParams::new(0, 2));
        // reach Ready without a handshake to exercise the length checks
        conn.state = ConnectionState::Ready;
        conn.pdu_length = MIN_PDU_LENGTH;

        assert!(matches!(
            conn.read_bytes(&iface, &mut transport, Area::DataBlock, 1, 0, 0),
            Err(S7Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            conn.read_bytes(
                &iface,
                &mut transport,
                Area::DataBlock,
                1,
                0,
                RESULT_BUFFER_CAPACITY + 1
            ),
            Err(S7Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            conn.read_bytes(&iface, &mut transport, Area::Counter, 0, 0, 3),
            Err(S7Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_read_multi_size_validation() {
        let iface = Interface::new("IF1");
        let (mut transport, _peer) = loopback_transport();
        let mut conn = Connection::new(ConnectionParams::new(0, 2));
        conn.state = ConnectionState::Ready;
        conn.pdu_length = MIN_PDU_LENGTH;

        // 20 items of 16 bytes overflow a 240 byte response
        let item = RequestItem::bytes(Area::Flag, 0, 0, 16).unwrap();
        let result = conn.read_multi(&iface, &mut transport, vec![item; 20]);
        assert!(matches!(result, Err(S7Error::InvalidParameter { .. })));
    }
}
