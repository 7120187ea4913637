//! ISO-on-TCP (RFC 1006) and COTP framing.
//!
//! This module builds and parses the two framing layers every S7 PDU travels
//! in: the 4-byte TPKT header that length-prefixes each packet on the TCP
//! stream, and the COTP (ISO 8073) layer that carries the connection
//! handshake and data transfer.
//!
//! # Frame layout
//!
//! ```text
//! +--------+--------+-----------------+
//! | TPKT   | COTP   | S7 PDU          |
//! | 4 bytes| 3 bytes| (data packets)  |
//! +--------+--------+-----------------+
//! ```
//!
//! The connection request/confirm exchange uses a longer COTP header that
//! carries the calling and called TSAPs; the called TSAP encodes the
//! connection type, rack, and slot of the target CPU.
//!
//! # Example
//!
//! ```
//! use s7comm::cotp::{ConnectRequest, ConnectionType};
//!
//! let request = ConnectRequest::new(ConnectionType::Pg, 0, 2).unwrap();
//! let frame = request.to_bytes();
//! assert_eq!(frame.len(), 22);
//! assert_eq!(frame[5], 0xE0); // COTP connection request
//! ```

use crate::error::{Result, S7Error};

/// TPKT protocol version (RFC 1006).
pub const TPKT_VERSION: u8 = 0x03;

/// Size of the TPKT header in bytes.
pub const TPKT_HEADER_SIZE: usize = 4;

/// Size of the COTP data-transfer header in bytes.
pub const DT_HEADER_SIZE: usize = 3;

/// Upper bound accepted for a whole inbound frame.
///
/// Large enough for the biggest negotiable PDU (960 bytes) plus framing,
/// small enough to reject nonsense TPKT lengths early.
pub const MAX_FRAME_SIZE: usize = 2048;

/// COTP PDU type codes seen during session setup and data transfer.
const COTP_CONNECT_REQUEST: u8 = 0xE0;
const COTP_CONNECT_CONFIRM: u8 = 0xD0;
const COTP_DISCONNECT_REQUEST: u8 = 0x80;
const COTP_DATA: u8 = 0xF0;

/// Calling TSAP used for all client connections.
const LOCAL_TSAP: u16 = 0x0100;

/// Logical connection type encoded in the called TSAP.
///
/// Selects which communication resource of the CPU the session binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionType {
    /// Programming-device resource (the common client choice).
    #[default]
    Pg,
    /// Operator-panel resource.
    Op,
    /// Basic S7 communication resource.
    Basic,
}

impl ConnectionType {
    /// Returns the code placed in the high byte of the called TSAP.
    pub(crate) fn code(self) -> u8 {
        match self {
            ConnectionType::Pg => 0x01,
            ConnectionType::Op => 0x02,
            ConnectionType::Basic => 0x03,
        }
    }
}

/// COTP connection request addressed at one CPU slot.
///
/// The called TSAP packs the connection type into its high byte and
/// `rack * 0x20 + slot` into its low byte, per the S7 addressing convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest {
    local_tsap: u16,
    remote_tsap: u16,
}

impl ConnectRequest {
    /// Creates a connection request for the given connection type, rack, and slot.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if `rack` exceeds 7 or `slot`
    /// exceeds 31; larger values do not fit the TSAP encoding.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::cotp::{ConnectRequest, ConnectionType};
    ///
    /// let request = ConnectRequest::new(ConnectionType::Pg, 0, 2).unwrap();
    /// assert_eq!(request.remote_tsap(), 0x0102);
    /// ```
    pub fn new(connection_type: ConnectionType, rack: u8, slot: u8) -> Result<Self> {
        if rack > 7 {
            return Err(S7Error::invalid_parameter("rack", "must be 0-7"));
        }
        if slot > 31 {
            return Err(S7Error::invalid_parameter("slot", "must be 0-31"));
        }
        let remote_tsap =
            ((connection_type.code() as u16) << 8) | ((rack as u16) * 0x20 + slot as u16);
        Ok(Self {
            local_tsap: LOCAL_TSAP,
            remote_tsap,
        })
    }

    /// Returns the calling TSAP.
    pub fn local_tsap(&self) -> u16 {
        self.local_tsap
    }

    /// Returns the called TSAP.
    pub fn remote_tsap(&self) -> u16 {
        self.remote_tsap
    }

    /// Serializes the full 22-byte connection request frame, TPKT included.
    pub fn to_bytes(&self) -> [u8; 22] {
        let mut frame: [u8; 22] = [
            // TPKT
            TPKT_VERSION, // version
            0x00,         // reserved
            0x00,         // length high
            0x16,         // length low (22)
            // COTP connection request
            0x11,                  // header length (17, excluding this byte)
            COTP_CONNECT_REQUEST,  // PDU type
            0x00, 0x00,            // destination reference
            0x00, 0x01,            // source reference
            0x00,                  // class 0, no options
            0xC0, 0x01, 0x0A,      // parameter: TPDU size 1024
            0xC1, 0x02, 0x00, 0x00, // parameter: calling TSAP
            0xC2, 0x02, 0x00, 0x00, // parameter: called TSAP
        ];
        frame[16..18].copy_from_slice(&self.local_tsap.to_be_bytes());
        frame[20..22].copy_from_slice(&self.remote_tsap.to_be_bytes());
        frame
    }
}

/// Parses a TPKT header and returns the remaining frame length.
///
/// # Errors
///
/// Returns `S7Error::MalformedFrame` if the version byte is wrong or the
/// declared total length is shorter than the smallest valid frame or larger
/// than [`MAX_FRAME_SIZE`].
pub fn tpkt_payload_len(header: &[u8; TPKT_HEADER_SIZE]) -> Result<usize> {
    if header[0] != TPKT_VERSION {
        return Err(S7Error::malformed_frame(format!(
            "TPKT version 0x{:02X}, expected 0x03",
            header[0]
        )));
    }
    let total = u16::from_be_bytes([header[2], header[3]]) as usize;
    if total < TPKT_HEADER_SIZE + 2 {
        return Err(S7Error::malformed_frame(format!(
            "TPKT length {} shorter than any COTP packet",
            total
        )));
    }
    if total > MAX_FRAME_SIZE {
        return Err(S7Error::malformed_frame(format!(
            "TPKT length {} exceeds the {} byte frame limit",
            total, MAX_FRAME_SIZE
        )));
    }
    Ok(total - TPKT_HEADER_SIZE)
}

/// Validates a COTP connection confirm.
///
/// `body` is the frame content after the TPKT header.
///
/// # Errors
///
/// - `S7Error::MalformedFrame` if the packet is too short to classify
/// - `S7Error::ConnectionRejected` if the peer answered anything other
///   than a connection confirm (a disconnect request carries the refusal)
pub fn parse_connect_confirm(body: &[u8]) -> Result<()> {
    if body.len() < 2 {
        return Err(S7Error::malformed_frame(
            "COTP packet too short for a connect confirm",
        ));
    }
    match body[1] {
        COTP_CONNECT_CONFIRM => Ok(()),
        COTP_DISCONNECT_REQUEST => Err(S7Error::connection_rejected(
            "peer answered with a disconnect request",
        )),
        other => Err(S7Error::connection_rejected(format!(
            "peer answered with COTP type 0x{:02X}",
            other
        ))),
    }
}

/// Wraps an S7 PDU in TPKT and COTP data headers for transmission.
pub fn frame_pdu(pdu: &[u8]) -> Vec<u8> {
    let total = TPKT_HEADER_SIZE + DT_HEADER_SIZE + pdu.len();
    let mut frame = Vec::with_capacity(total);
    frame.push(TPKT_VERSION);
    frame.push(0x00);
    frame.extend_from_slice(&(total as u16).to_be_bytes());
    frame.push(0x02); // COTP header length
    frame.push(COTP_DATA);
    frame.push(0x80); // TPDU number 0, end of transmission
    frame.extend_from_slice(pdu);
    frame
}

/// Strips the COTP data header from a received frame body.
///
/// `body` is the frame content after the TPKT header; the returned slice is
/// the carried S7 PDU.
///
/// # Errors
///
/// - `S7Error::MalformedFrame` if the header is truncated, has the wrong
///   length indicator, or signals a fragmented TPDU (not supported)
/// - `S7Error::UnexpectedPdu` if the packet is not a COTP data transfer
pub fn strip_dt_header(body: &[u8]) -> Result<&[u8]> {
    if body.len() < DT_HEADER_SIZE {
        return Err(S7Error::malformed_frame(
            "COTP packet too short for a data header",
        ));
    }
    if body[1] != COTP_DATA {
        return Err(S7Error::unexpected_pdu(format!(
            "COTP type 0x{:02X} where data was expected",
            body[1]
        )));
    }
    if body[0] != 0x02 {
        return Err(S7Error::malformed_frame(format!(
            "COTP data header length {}, expected 2",
            body[0]
        )));
    }
    if body[2] & 0x80 == 0 {
        return Err(S7Error::malformed_frame(
            "fragmented COTP data is not supported",
        ));
    }
    Ok(&body[DT_HEADER_SIZE..])
}
