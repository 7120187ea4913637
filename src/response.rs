//! S7 ack-data PDU parsing.
//!
//! This module parses the response side of the S7 protocol: the ack-data
//! PDUs a CPU returns for setup, read, and write jobs.
//!
//! # Response Structure
//!
//! An ack-data PDU consists of:
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | Header | 12 bytes | Job header plus error class and error code |
//! | Parameters | Variable | Function code, item count, setup results |
//! | Data | Variable | Per-item status and payload (reads), status bytes (writes) |
//!
//! # Error Reporting
//!
//! A response is successful if the header error class and code are both
//! 0x00 and, for read/write functions, each item status is 0xFF. Header
//! errors reject the whole request; item statuses are reported per item.
//!
//! # Example
//!
//! ```
//! use s7comm::response::AckData;
//!
//! // Setup-communication ack granting a 240-byte PDU
//! let pdu = [
//!     0x32, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00,
//!     0xF0, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0xF0,
//! ];
//! let ack = AckData::from_pdu(&pdu).unwrap();
//! ack.check_errors().unwrap();
//! assert_eq!(ack.negotiated_pdu_length().unwrap(), 240);
//! ```

use crate::command::{
    FN_READ_VAR, FN_SETUP_COMMUNICATION, FN_WRITE_VAR, MSG_ACK_DATA, MSG_JOB, S7_PROTOCOL_ID,
};
use crate::error::{Result, S7Error};

/// Size of the ack-data header in bytes.
pub(crate) const ACK_HEADER_SIZE: usize = 12;

/// Per-item status marking success.
pub(crate) const ITEM_STATUS_SUCCESS: u8 = 0xFF;

// Result transport sizes whose length field counts bits.
const TS_RES_BYTE: u8 = 0x04;
const TS_RES_INT: u8 = 0x05;

/// Parsed ack-data PDU.
///
/// [`AckData::from_pdu`] validates structure only; request pairing and
/// error translation are separate steps so that callers can distinguish
/// protocol violations from PLC-reported failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckData {
    pdu_ref: u16,
    error_class: u8,
    error_code: u8,
    params: Vec<u8>,
    data: Vec<u8>,
}

/// One item of a read response: status plus payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    /// Item status byte; 0xFF marks success.
    pub status: u8,
    /// Payload bytes, empty for failed items.
    pub data: Vec<u8>,
}

impl DataItem {
    /// Returns whether the item succeeded.
    pub fn is_success(&self) -> bool {
        self.status == ITEM_STATUS_SUCCESS
    }

    /// Converts the item into its payload, translating failure statuses.
    ///
    /// # Errors
    ///
    /// Returns the translated PLC error for any status other than 0xFF.
    pub fn into_result(self) -> Result<Vec<u8>> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(S7Error::from_item_status(self.status))
        }
    }
}

impl AckData {
    /// Parses an ack-data PDU from bytes.
    ///
    /// # Errors
    ///
    /// - `S7Error::MalformedFrame` if the PDU is truncated, carries the
    ///   wrong protocol id, or its length fields disagree with the frame
    /// - `S7Error::UnexpectedPdu` if the message type is not ack-data
    pub fn from_pdu(pdu: &[u8]) -> Result<Self> {
        if pdu.len() < ACK_HEADER_SIZE {
            return Err(S7Error::malformed_frame(format!(
                "PDU of {} bytes is shorter than the ack-data header",
                pdu.len()
            )));
        }
        if pdu[0] != S7_PROTOCOL_ID {
            return Err(S7Error::malformed_frame(format!(
                "protocol id 0x{:02X}, expected 0x32",
                pdu[0]
            )));
        }
        match pdu[1] {
            MSG_ACK_DATA => {}
            MSG_JOB => {
                return Err(S7Error::unexpected_pdu(
                    "job PDU where ack-data was expected",
                ))
            }
            other => {
                return Err(S7Error::unexpected_pdu(format!(
                    "message type 0x{:02X} where ack-data was expected",
                    other
                )))
            }
        }

        let pdu_ref = u16::from_be_bytes([pdu[4], pdu[5]]);
        let param_len = u16::from_be_bytes([pdu[6], pdu[7]]) as usize;
        let data_len = u16::from_be_bytes([pdu[8], pdu[9]]) as usize;
        if ACK_HEADER_SIZE + param_len + data_len != pdu.len() {
            return Err(S7Error::malformed_frame(format!(
                "length fields promise {} bytes but the PDU holds {}",
                ACK_HEADER_SIZE + param_len + data_len,
                pdu.len()
            )));
        }

        Ok(Self {
            pdu_ref,
            error_class: pdu[10],
            error_code: pdu[11],
            params: pdu[ACK_HEADER_SIZE..ACK_HEADER_SIZE + param_len].to_vec(),
            data: pdu[ACK_HEADER_SIZE + param_len..].to_vec(),
        })
    }

    /// Returns the echoed PDU reference.
    pub fn pdu_ref(&self) -> u16 {
        self.pdu_ref
    }

    /// Returns the function code, if the parameter section carries one.
    pub fn function(&self) -> Option<u8> {
        self.params.first().copied()
    }

    /// Checks that this response answers the request with the given reference.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::UnexpectedPdu` on a mismatch.
    pub fn check_ref(&self, expected: u16) -> Result<()> {
        if self.pdu_ref != expected {
            return Err(S7Error::unexpected_pdu(format!(
                "PDU reference 0x{:04X}, expected 0x{:04X}",
                self.pdu_ref, expected
            )));
        }
        Ok(())
    }

    /// Checks the header error class and code.
    ///
    /// # Errors
    ///
    /// Returns the translated PLC error for a nonzero class/code pair.
    pub fn check_errors(&self) -> Result<()> {
        if self.error_class != 0 || self.error_code != 0 {
            return Err(S7Error::from_header_status(
                self.error_class,
                self.error_code,
            ));
        }
        Ok(())
    }

    fn check_function(&self, expected: u8) -> Result<()> {
        match self.function() {
            Some(f) if f == expected => Ok(()),
            Some(f) => Err(S7Error::unexpected_pdu(format!(
                "function 0x{:02X}, expected 0x{:02X}",
                f, expected
            ))),
            None => Err(S7Error::unexpected_pdu("response carries no function")),
        }
    }

    /// Extracts the PDU length granted by a setup-communication ack.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::UnexpectedPdu` if this is not a setup ack and
    /// `S7Error::MalformedFrame` if the parameter section is truncated or
    /// grants a zero length.
    pub fn negotiated_pdu_length(&self) -> Result<u16> {
        self.check_function(FN_SETUP_COMMUNICATION)?;
        if self.params.len() < 8 {
            return Err(S7Error::malformed_frame(
                "setup ack parameters are truncated",
            ));
        }
        let length = u16::from_be_bytes([self.params[6], self.params[7]]);
        if length == 0 {
            return Err(S7Error::malformed_frame("negotiated PDU length is 0"));
        }
        Ok(length)
    }

    /// Extracts the items of a read-var ack.
    ///
    /// Every item carries a 4-byte header (status, transport size, length);
    /// length fields of byte-oriented transport sizes count bits. Payloads
    /// of odd length are padded to even offsets between items.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::UnexpectedPdu` if this is not a read ack or the
    /// item count differs from the request, `S7Error::MalformedFrame` if
    /// the data section is truncated.
    pub fn read_items(&self, expected_items: usize) -> Result<Vec<DataItem>> {
        self.check_function(FN_READ_VAR)?;
        let count = self.params.get(1).copied().unwrap_or(0) as usize;
        if count != expected_items {
            return Err(S7Error::unexpected_pdu(format!(
                "{} response items, expected {}",
                count, expected_items
            )));
        }

        let mut items = Vec::with_capacity(count);
        let mut offset = 0;
        for index in 0..count {
            let header = self.data.get(offset..offset + 4).ok_or_else(|| {
                S7Error::malformed_frame("read response item header is truncated")
            })?;
            let status = header[0];
            let transport_size = header[1];
            let length_field = u16::from_be_bytes([header[2], header[3]]) as usize;
            let payload_len = match transport_size {
                TS_RES_BYTE | TS_RES_INT => length_field / 8,
                _ => length_field,
            };
            offset += 4;

            let data = if status == ITEM_STATUS_SUCCESS && payload_len > 0 {
                let payload = self.data.get(offset..offset + payload_len).ok_or_else(|| {
                    S7Error::malformed_frame("read response payload is truncated")
                })?;
                offset += payload_len;
                payload.to_vec()
            } else {
                Vec::new()
            };

            // fill byte keeps the next item on an even offset
            if payload_len % 2 != 0 && index + 1 < count {
                offset += 1;
            }

            items.push(DataItem { status, data });
        }
        Ok(items)
    }

    /// Reduces a write-var ack to one aggregate status.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::UnexpectedPdu` if this is not a write ack,
    /// `S7Error::MalformedFrame` if the status byte is missing, or the
    /// translated PLC error of the first failing item.
    pub fn write_status(&self) -> Result<()> {
        self.check_function(FN_WRITE_VAR)?;
        let count = self.params.get(1).copied().unwrap_or(0) as usize;
        if self.data.len() < count {
            return Err(S7Error::malformed_frame(
                "write response is missing item statuses",
            ));
        }
        for &status in &self.data[..count] {
            if status != ITEM_STATUS_SUCCESS {
                return Err(S7Error::from_item_status(status));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds an ack-data PDU with the given header fields and sections.
    fn make_ack(pdu_ref: u16, error: (u8, u8), params: &[u8], data: &[u8]) -> Vec<u8> {
        let mut pdu = Vec::with_capacity(ACK_HEADER_SIZE + params.len() + data.len());
        pdu.push(0x32);
        pdu.push(0x03);
        pdu.extend_from_slice(&[0x00, 0x00]);
        pdu.extend_from_slice(&pdu_ref.to_be_bytes());
        pdu.extend_from_slice(&(params.len() as u16).to_be_bytes());
        pdu.extend_from_slice(&(data.len() as u16).to_be_bytes());
        pdu.push(error.0);
        pdu.push(error.1);
        pdu.extend_from_slice(params);
        pdu.extend_from_slice(data);
        pdu
    }

    #[test]
    fn test_from_pdu_parses_header() {
        let pdu = make_ack(0x0005, (0x00, 0x00), &[0x04, 0x00], &[]);
        let ack = AckData::from_pdu(&pdu).unwrap();

        assert_eq!(ack.pdu_ref(), 0x0005);
        assert_eq!(ack.function(), Some(0x04));
        assert!(ack.check_errors().is_ok());
    }

    #[test]
    fn test_from_pdu_rejects_garbage() {
        // truncated
        assert!(matches!(
            AckData::from_pdu(&[0x32, 0x03]),
            Err(S7Error::MalformedFrame { .. })
        ));

        // wrong protocol id
        let mut pdu = make_ack(0x0001, (0x00, 0x00), &[], &[]);
        pdu[0] = 0x33;
        assert!(matches!(
            AckData::from_pdu(&pdu),
            Err(S7Error::MalformedFrame { .. })
        ));

        // job instead of ack-data
        let mut pdu = make_ack(0x0001, (0x00, 0x00), &[], &[]);
        pdu[1] = 0x01;
        assert!(matches!(
            AckData::from_pdu(&pdu),
            Err(S7Error::UnexpectedPdu { .. })
        ));

        // length fields disagree with the frame
        let mut pdu = make_ack(0x0001, (0x00, 0x00), &[0x04, 0x01], &[]);
        pdu[7] = 0x05;
        assert!(matches!(
            AckData::from_pdu(&pdu),
            Err(S7Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_check_ref() {
        let pdu = make_ack(0x0042, (0x00, 0x00), &[0x04, 0x00], &[]);
        let ack = AckData::from_pdu(&pdu).unwrap();

        assert!(ack.check_ref(0x0042).is_ok());
        assert!(matches!(
            ack.check_ref(0x0043),
            Err(S7Error::UnexpectedPdu { .. })
        ));
    }

    #[test]
    fn test_check_errors_translates_header_status() {
        let pdu = make_ack(0x0001, (0x83, 0x04), &[], &[]);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(matches!(ack.check_errors(), Err(S7Error::PlcBusy)));

        let pdu = make_ack(0x0001, (0x84, 0x04), &[], &[]);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(matches!(
            ack.check_errors(),
            Err(S7Error::PlcFailure { code: 0x8404 })
        ));
    }

    #[test]
    fn test_negotiated_pdu_length() {
        let params = [0xF0, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0xF0];
        let pdu = make_ack(0x0001, (0x00, 0x00), &params, &[]);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert_eq!(ack.negotiated_pdu_length().unwrap(), 240);

        // not a setup ack
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x04, 0x00], &[]);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(matches!(
            ack.negotiated_pdu_length(),
            Err(S7Error::UnexpectedPdu { .. })
        ));

        // zero grant
        let params = [0xF0, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00];
        let pdu = make_ack(0x0001, (0x00, 0x00), &params, &[]);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(matches!(
            ack.negotiated_pdu_length(),
            Err(S7Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_read_items_single() {
        // 2 bytes of payload, length counted in bits
        let data = [0xFF, 0x04, 0x00, 0x10, 0x00, 0x05];
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x04, 0x01], &data);
        let ack = AckData::from_pdu(&pdu).unwrap();

        let items = ack.read_items(1).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_success());
        assert_eq!(items[0].data, vec![0x00, 0x05]);
    }

    #[test]
    fn test_read_items_bit_payload() {
        // single bit: transport size 0x03, length counts one bit, one payload byte
        let data = [0xFF, 0x03, 0x00, 0x01, 0x01];
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x04, 0x01], &data);
        let ack = AckData::from_pdu(&pdu).unwrap();

        let items = ack.read_items(1).unwrap();
        assert_eq!(items[0].data, vec![0x01]);
    }

    #[test]
    fn test_read_items_pads_between_items() {
        let data = [
            0xFF, 0x04, 0x00, 0x08, 0xAB, 0x00, // one byte, then a fill byte
            0xFF, 0x04, 0x00, 0x10, 0x00, 0x05, // two bytes
        ];
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x04, 0x02], &data);
        let ack = AckData::from_pdu(&pdu).unwrap();

        let items = ack.read_items(2).unwrap();
        assert_eq!(items[0].data, vec![0xAB]);
        assert_eq!(items[1].data, vec![0x00, 0x05]);
    }

    #[test]
    fn test_read_items_reports_item_failure() {
        let data = [
            0x0A, 0x00, 0x00, 0x00, // area not accessible, no payload
            0xFF, 0x04, 0x00, 0x08, 0x07,
        ];
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x04, 0x02], &data);
        let ack = AckData::from_pdu(&pdu).unwrap();

        let items = ack.read_items(2).unwrap();
        assert!(!items[0].is_success());
        assert!(matches!(
            items[0].clone().into_result(),
            Err(S7Error::AreaNotAccessible)
        ));
        assert_eq!(items[1].data, vec![0x07]);
    }

    #[test]
    fn test_read_items_count_mismatch() {
        let data = [0xFF, 0x04, 0x00, 0x08, 0xAB];
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x04, 0x01], &data);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(matches!(
            ack.read_items(2),
            Err(S7Error::UnexpectedPdu { .. })
        ));
    }

    #[test]
    fn test_read_items_truncated_payload() {
        let data = [0xFF, 0x04, 0x00, 0x20, 0x00, 0x05];
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x04, 0x01], &data);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(matches!(
            ack.read_items(1),
            Err(S7Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_write_status() {
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x05, 0x01], &[0xFF]);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(ack.write_status().is_ok());

        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x05, 0x01], &[0x05]);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(matches!(
            ack.write_status(),
            Err(S7Error::AddressOutOfRange)
        ));

        // status byte missing
        let pdu = make_ack(0x0001, (0x00, 0x00), &[0x05, 0x01], &[]);
        let ack = AckData::from_pdu(&pdu).unwrap();
        assert!(matches!(
            ack.write_status(),
            Err(S7Error::MalformedFrame { .. })
        ));
    }
}
