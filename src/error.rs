//! Error types for S7 communication.

use std::io;
use thiserror::Error;

/// Result type alias for S7 operations.
pub type Result<T> = std::result::Result<T, S7Error>;

/// Errors that can occur during S7 communication.
///
/// Variants fall into four groups: transport failures (`Timeout`,
/// `ConnectionClosed`, `Io`), protocol violations (`MalformedFrame`,
/// `ConnectionRejected`, `UnexpectedPdu`), errors reported by the PLC
/// (`AreaNotAccessible`, `AddressOutOfRange`, `PlcBusy`, `PlcFailure`), and
/// caller mistakes (`NotConnected`, `BufferOutOfRange`, `InvalidParameter`,
/// `InvalidHandle`). Transport and protocol errors drop the connection back
/// to the disconnected state; PLC-reported and usage errors do not.
#[derive(Debug, Error)]
pub enum S7Error {
    /// Communication timeout.
    #[error("Communication timeout")]
    Timeout,

    /// The peer closed the transport connection.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A frame failed TPKT/COTP validation.
    #[error("Malformed frame: {reason}")]
    MalformedFrame {
        /// Description of the framing error.
        reason: String,
    },

    /// The device refused the COTP connection request.
    #[error("Connection rejected: {reason}")]
    ConnectionRejected {
        /// Description of the rejection.
        reason: String,
    },

    /// A structurally valid PDU arrived that does not match the request.
    #[error("Unexpected PDU: {reason}")]
    UnexpectedPdu {
        /// Description of the mismatch.
        reason: String,
    },

    /// The PLC reported the addressed area or object as not accessible.
    #[error("Area not accessible")]
    AreaNotAccessible,

    /// The PLC reported the address as outside the addressed area.
    #[error("Address out of range")]
    AddressOutOfRange,

    /// The PLC has no resources available for the request.
    #[error("PLC busy: no resources available")]
    PlcBusy,

    /// Any other PLC-reported failure, with the raw status code.
    #[error("PLC error: code 0x{code:04X}")]
    PlcFailure {
        /// Raw status code from the PLC response.
        code: u16,
    },

    /// An operation was issued on a connection that is not ready.
    #[error("Not connected")]
    NotConnected,

    /// A result-buffer access fell outside the populated length.
    #[error("Buffer access out of range: offset {offset} + length {length} exceeds {populated} populated bytes")]
    BufferOutOfRange {
        /// Requested byte offset.
        offset: usize,
        /// Requested field width in bytes.
        length: usize,
        /// Populated length of the buffer.
        populated: usize,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// A registry handle that does not name a live object.
    #[error("Invalid handle: {handle}")]
    InvalidHandle {
        /// The offending handle value.
        handle: u32,
    },
}

impl S7Error {
    /// Creates a new `MalformedFrame` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::S7Error;
    ///
    /// let err = S7Error::malformed_frame("TPKT length shorter than header");
    /// ```
    pub fn malformed_frame(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Creates a new `ConnectionRejected` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::S7Error;
    ///
    /// let err = S7Error::connection_rejected("confirm carried PDU type 0x80");
    /// ```
    pub fn connection_rejected(reason: impl Into<String>) -> Self {
        Self::ConnectionRejected {
            reason: reason.into(),
        }
    }

    /// Creates a new `UnexpectedPdu` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::S7Error;
    ///
    /// let err = S7Error::unexpected_pdu("ack-data for a different function");
    /// ```
    pub fn unexpected_pdu(reason: impl Into<String>) -> Self {
        Self::UnexpectedPdu {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::S7Error;
    ///
    /// let err = S7Error::invalid_parameter("length", "must be greater than 0");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether this error invalidates the session.
    ///
    /// Transport and protocol errors leave the request/response lock-step in
    /// an unknown position, so the connection falls back to disconnected and
    /// must be re-established. PLC-reported rejections and caller mistakes
    /// answer a request cleanly and leave the session usable.
    pub fn drops_connection(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::ConnectionClosed
                | Self::Io(_)
                | Self::MalformedFrame { .. }
                | Self::ConnectionRejected { .. }
                | Self::UnexpectedPdu { .. }
        )
    }

    /// Translates a per-item status byte from an ack-data response.
    ///
    /// Status 0xFF means success and never reaches this function. Known
    /// rejection codes map to their taxonomy variant; anything else falls
    /// back to [`S7Error::PlcFailure`] with the raw code.
    pub fn from_item_status(status: u8) -> Self {
        match status {
            0x03 | 0x0A => Self::AreaNotAccessible,
            0x05 => Self::AddressOutOfRange,
            code => Self::PlcFailure { code: code as u16 },
        }
    }

    /// Translates the error class/code pair from an ack-data header.
    ///
    /// Class 0x00 means success and never reaches this function. Class 0x83
    /// (no resources available) maps to [`S7Error::PlcBusy`]; everything else
    /// falls back to [`S7Error::PlcFailure`] with class and code packed
    /// big-endian into one status word.
    pub fn from_header_status(class: u8, code: u8) -> Self {
        match class {
            0x83 => Self::PlcBusy,
            _ => Self::PlcFailure {
                code: u16::from_be_bytes([class, code]),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = S7Error::Timeout;
        assert_eq!(err.to_string(), "Communication timeout");
    }

    #[test]
    fn test_malformed_frame_display() {
        let err = S7Error::malformed_frame("TPKT version 1");
        assert_eq!(err.to_string(), "Malformed frame: TPKT version 1");
    }

    #[test]
    fn test_plc_failure_display() {
        let err = S7Error::PlcFailure { code: 0x8404 };
        assert_eq!(err.to_string(), "PLC error: code 0x8404");
    }

    #[test]
    fn test_buffer_out_of_range_display() {
        let err = S7Error::BufferOutOfRange {
            offset: 22,
            length: 4,
            populated: 24,
        };
        assert_eq!(
            err.to_string(),
            "Buffer access out of range: offset 22 + length 4 exceeds 24 populated bytes"
        );
    }

    #[test]
    fn test_item_status_translation() {
        assert!(matches!(
            S7Error::from_item_status(0x05),
            S7Error::AddressOutOfRange
        ));
        assert!(matches!(
            S7Error::from_item_status(0x0A),
            S7Error::AreaNotAccessible
        ));
        assert!(matches!(
            S7Error::from_item_status(0x03),
            S7Error::AreaNotAccessible
        ));
        assert!(matches!(
            S7Error::from_item_status(0x01),
            S7Error::PlcFailure { code: 0x0001 }
        ));
    }

    #[test]
    fn test_header_status_translation() {
        assert!(matches!(
            S7Error::from_header_status(0x83, 0x00),
            S7Error::PlcBusy
        ));
        assert!(matches!(
            S7Error::from_header_status(0x84, 0x04),
            S7Error::PlcFailure { code: 0x8404 }
        ));
    }

    #[test]
    fn test_drops_connection_classification() {
        assert!(S7Error::Timeout.drops_connection());
        assert!(S7Error::ConnectionClosed.drops_connection());
        assert!(S7Error::malformed_frame("short TPKT").drops_connection());
        assert!(S7Error::unexpected_pdu("reference mismatch").drops_connection());

        assert!(!S7Error::AddressOutOfRange.drops_connection());
        assert!(!S7Error::PlcBusy.drops_connection());
        assert!(!S7Error::NotConnected.drops_connection());
        assert!(!S7Error::InvalidHandle { handle: 7 }.drops_connection());
    }
}
